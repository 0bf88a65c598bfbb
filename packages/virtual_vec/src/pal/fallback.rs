use std::alloc::{self, Layout};
use std::io;
use std::num::NonZero;
use std::ptr::NonNull;

use new_zealand::nz;

use crate::pal::Platform;

/// Page size reported on platforms where we cannot ask the operating system.
const DEFAULT_PAGE_SIZE: NonZero<usize> = nz!(4096);

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
#[cfg(any(miri, not(any(unix, windows))))]
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform::new();

#[cfg(any(miri, not(any(unix, windows))))]
pub(crate) type BuildTargetPlatform = FallbackPlatform;

/// Emulates virtual memory on top of the Rust global allocator.
///
/// A reservation is a single heap allocation of the full requested size, aligned to the
/// simulated page size. Commit and decommit only validate their arguments, as heap memory is
/// always accessible. This is what runs under Miri and on platforms without a native
/// implementation, and unit tests use it to simulate hosts with unusual page sizes.
#[derive(Debug)]
pub(crate) struct FallbackPlatform {
    page_size: NonZero<usize>,
}

impl FallbackPlatform {
    pub(crate) const fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// # Panics
    ///
    /// Panics if the page size is not a power of two.
    pub(crate) const fn with_page_size(page_size: NonZero<usize>) -> Self {
        assert!(page_size.is_power_of_two(), "page size must be a power of two");

        Self { page_size }
    }

    fn reservation_layout(&self, len: usize) -> Result<Layout, io::Error> {
        Layout::from_size_align(len, self.page_size.get())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }

    fn check_page_multiple(&self, value: usize) -> Result<(), io::Error> {
        if value.is_multiple_of(self.page_size.get()) {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{value} is not a multiple of the page size {}", self.page_size),
            ))
        }
    }
}

impl Platform for FallbackPlatform {
    fn page_size(&self) -> NonZero<usize> {
        self.page_size
    }

    fn reserve(&self, len: usize) -> Result<NonNull<u8>, io::Error> {
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot reserve an empty range",
            ));
        }

        self.check_page_multiple(len)?;
        let layout = self.reservation_layout(len)?;

        // SAFETY: The layout has a nonzero size, as checked above.
        let ptr = unsafe { alloc::alloc(layout) };

        NonNull::new(ptr).ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))
    }

    fn commit(
        &self,
        base: NonNull<u8>,
        offset: usize,
        len: usize,
    ) -> Result<NonNull<u8>, io::Error> {
        self.check_page_multiple(offset)?;
        self.check_page_multiple(len)?;

        // SAFETY: The caller guarantees the range is inside a live reservation we handed out.
        Ok(unsafe { base.add(offset) })
    }

    fn decommit(&self, _base: NonNull<u8>, offset: usize, len: usize) -> Result<(), io::Error> {
        self.check_page_multiple(offset)?;
        self.check_page_multiple(len)
    }

    fn release(&self, base: NonNull<u8>, len: usize) {
        let layout = self
            .reservation_layout(len)
            .expect("layout was valid when the range was reserved");

        // SAFETY: The caller guarantees this is a whole reservation from reserve(), which
        // allocated it with this exact layout.
        unsafe { alloc::dealloc(base.as_ptr(), layout) };
    }
}
