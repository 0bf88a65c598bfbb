use std::fmt::Debug;
use std::io;
use std::num::NonZero;
use std::ptr::NonNull;

/// The virtual memory operations that the container needs from the operating system.
///
/// All PAL calls into the operating system go through this trait, enabling them to be mocked.
///
/// Addresses passed to `commit()`, `decommit()` and `release()` must describe a range that was
/// obtained from `reserve()` on the same platform and has not yet been released. The container
/// is the only caller and upholds this.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// The granularity of commit and decommit operations, in bytes.
    fn page_size(&self) -> NonZero<usize>;

    /// Reserves `len` bytes of address space without backing it with memory.
    ///
    /// The returned range is not accessible until committed. `len` is a nonzero
    /// multiple of the page size.
    fn reserve(&self, len: usize) -> Result<NonNull<u8>, io::Error>;

    /// Backs `len` bytes at `offset` from the start of a reservation with read/write memory.
    ///
    /// Returns a pointer to the start of the committed range. `offset` and `len` are
    /// multiples of the page size.
    fn commit(&self, base: NonNull<u8>, offset: usize, len: usize)
    -> Result<NonNull<u8>, io::Error>;

    /// Returns the memory backing `len` bytes at `offset` to the operating system, making the
    /// range inaccessible again. The range stays reserved.
    fn decommit(&self, base: NonNull<u8>, offset: usize, len: usize) -> Result<(), io::Error>;

    /// Releases an entire reservation of `len` bytes starting at `base`.
    fn release(&self, base: NonNull<u8>, len: usize);
}
