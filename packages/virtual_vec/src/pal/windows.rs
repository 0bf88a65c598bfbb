use std::io;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;

use windows::Win32::System::Memory::{
    MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE,
    VirtualAlloc, VirtualFree,
};
use windows::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

use crate::pal::Platform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform::new();

/// Virtual memory operations on top of `VirtualAlloc()` and `VirtualFree()`.
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
    fn page_size(&self) -> NonZero<usize> {
        let mut info = MaybeUninit::<SYSTEM_INFO>::uninit();

        // SAFETY: No safety requirements beyond passing a valid output pointer.
        unsafe { GetSystemInfo(info.as_mut_ptr()) };

        // SAFETY: GetSystemInfo() always fills the structure.
        let info = unsafe { info.assume_init() };

        NonZero::new(info.dwPageSize as usize).expect("operating system reported zero page size")
    }

    fn reserve(&self, len: usize) -> Result<NonNull<u8>, io::Error> {
        // SAFETY: Reserving at an address of the operating system's choosing does not affect
        // any existing memory.
        let addr = unsafe { VirtualAlloc(None, len, MEM_RESERVE, PAGE_NOACCESS) };

        NonNull::new(addr.cast::<u8>()).ok_or_else(io::Error::last_os_error)
    }

    fn commit(
        &self,
        base: NonNull<u8>,
        offset: usize,
        len: usize,
    ) -> Result<NonNull<u8>, io::Error> {
        // SAFETY: The caller guarantees the range is inside a live reservation we handed out.
        let start = unsafe { base.add(offset) };

        // SAFETY: Committing pages inside our own reservation does not affect any memory the
        // program could already be referencing.
        let addr = unsafe {
            VirtualAlloc(
                Some(start.as_ptr().cast_const().cast()),
                len,
                MEM_COMMIT,
                PAGE_READWRITE,
            )
        };

        NonNull::new(addr.cast::<u8>()).ok_or_else(io::Error::last_os_error)
    }

    fn decommit(&self, base: NonNull<u8>, offset: usize, len: usize) -> Result<(), io::Error> {
        // SAFETY: The caller guarantees the range is inside a live reservation we handed out.
        let start = unsafe { base.add(offset) };

        // SAFETY: The caller guarantees no live objects remain in the range.
        unsafe { VirtualFree(start.as_ptr().cast(), len, MEM_DECOMMIT) }.map_err(io::Error::from)
    }

    fn release(&self, base: NonNull<u8>, _len: usize) {
        // MEM_RELEASE requires a zero size and releases the entire reservation.
        // SAFETY: The caller guarantees this is a whole reservation that is no longer in use.
        unsafe { VirtualFree(base.as_ptr().cast(), 0, MEM_RELEASE) }
            .expect("releasing a reservation can only fail if our bookkeeping is broken");
    }
}
