use std::cell::Cell;
use std::marker::PhantomData;

use crate::pal::PlatformFacade;
use crate::{Result, VirtualVec};

/// The amount of address space a container reserves unless configured otherwise: 1 GiB.
pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024 * 1024;

/// Builder for creating an instance of [`VirtualVec`].
///
/// The only setting is the size of the address space reservation, which determines the
/// maximum capacity of the container. It defaults to [`DEFAULT_MAX_BYTES`].
///
/// # Examples
///
/// ```
/// use virtual_vec::VirtualVec;
///
/// let mut numbers = VirtualVec::<u64>::builder()
///     .max_bytes(64 * 1024 * 1024)
///     .build()?;
///
/// numbers.push(42)?;
/// assert_eq!(numbers[0], 42);
/// # Ok::<(), virtual_vec::Error>(())
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]).
#[derive(Debug)]
#[must_use]
pub struct VirtualVecBuilder<T> {
    max_bytes: usize,
    platform: PlatformFacade,

    _element: PhantomData<fn() -> T>,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> VirtualVecBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            platform: PlatformFacade::target(),
            _element: PhantomData,
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of bytes of address space to reserve.
    ///
    /// The value is rounded down to a multiple of the page size. The maximum capacity of the
    /// container is the rounded value divided by the size of `T`. No physical memory is used
    /// until elements are added.
    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[cfg(test)]
    pub(crate) fn platform(mut self, platform: PlatformFacade) -> Self {
        self.platform = platform;
        self
    }

    /// Reserves the address space and creates an empty container.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`][crate::Error::CapacityExceeded] if the reservation
    /// cannot hold even a single element and
    /// [`Error::AddressSpace`][crate::Error::AddressSpace] if the operating system refuses
    /// the reservation.
    ///
    /// # Panics
    ///
    /// Panics if `T` is a zero-sized type or requires an alignment greater than the page size.
    pub fn build(self) -> Result<VirtualVec<T>> {
        VirtualVec::new_inner(self.platform, self.max_bytes)
    }
}
