use std::io;
use std::num::NonZero;
use std::ptr::{self, NonNull};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_NONE, PROT_READ, PROT_WRITE, c_void};

use crate::pal::Platform;

#[cfg(target_os = "linux")]
const RESERVE_FLAGS: libc::c_int = MAP_PRIVATE | MAP_ANONYMOUS | libc::MAP_NORESERVE;
#[cfg(not(target_os = "linux"))]
const RESERVE_FLAGS: libc::c_int = MAP_PRIVATE | MAP_ANONYMOUS;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform::new();

/// Virtual memory operations on top of `mmap()` and friends.
///
/// A reservation is an anonymous `PROT_NONE` mapping. Committing flips pages to read/write,
/// after which the kernel backs them with physical memory on first touch.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

impl BuildTargetPlatform {
    pub(crate) const fn new() -> Self {
        Self
    }
}

// Real OS calls are excluded from coverage measurement because error paths require
// OS-level failures that are impractical to trigger in tests.
#[cfg_attr(coverage_nightly, coverage(off))]
impl Platform for BuildTargetPlatform {
    #[expect(
        clippy::cast_sign_loss,
        reason = "sysconf only returns negative values on error, which we check for"
    )]
    fn page_size(&self) -> NonZero<usize> {
        // SAFETY: No safety requirements.
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

        assert!(page_size > 0, "{}", io::Error::last_os_error());

        NonZero::new(page_size as usize).expect("guarded by assertion above")
    }

    fn reserve(&self, len: usize) -> Result<NonNull<u8>, io::Error> {
        // SAFETY: We are asking for a fresh anonymous mapping at an address of the kernel's
        // choosing, so no existing memory is affected.
        let addr = unsafe { libc::mmap(ptr::null_mut(), len, PROT_NONE, RESERVE_FLAGS, -1, 0) };

        if addr == MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        NonNull::new(addr.cast::<u8>()).ok_or_else(|| io::Error::other("mmap() returned null"))
    }

    fn commit(
        &self,
        base: NonNull<u8>,
        offset: usize,
        len: usize,
    ) -> Result<NonNull<u8>, io::Error> {
        // SAFETY: The caller guarantees the range is inside a live reservation we handed out.
        let start = unsafe { base.add(offset) };

        // SAFETY: Changing the protection of pages inside our own reservation does not affect
        // any memory the program could already be referencing.
        let result = unsafe {
            libc::mprotect(start.as_ptr().cast::<c_void>(), len, PROT_READ | PROT_WRITE)
        };

        if result == 0 {
            Ok(start)
        } else {
            Err(io::Error::last_os_error())
        }
    }

    fn decommit(&self, base: NonNull<u8>, offset: usize, len: usize) -> Result<(), io::Error> {
        // SAFETY: The caller guarantees the range is inside a live reservation we handed out.
        let start = unsafe { base.add(offset) }.as_ptr().cast::<c_void>();

        // SAFETY: The caller guarantees no live objects remain in the range, so discarding
        // its contents is not observable.
        if unsafe { libc::madvise(start, len, libc::MADV_DONTNEED) } != 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: As above, only pages of our own reservation are affected.
        if unsafe { libc::mprotect(start, len, PROT_NONE) } != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    fn release(&self, base: NonNull<u8>, len: usize) {
        // SAFETY: The caller guarantees this is a whole reservation that is no longer in use.
        let result = unsafe { libc::munmap(base.as_ptr().cast::<c_void>(), len) };

        // There is nothing a caller could do about a failed release and it can only fail if
        // the bookkeeping is broken, so treat it as a bug.
        assert!(result == 0, "{}", io::Error::last_os_error());
    }
}
