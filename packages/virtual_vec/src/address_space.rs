use std::num::NonZero;
use std::ptr::NonNull;

use tracing::{debug, trace};

use crate::pal::{Platform, PlatformFacade};
use crate::rounding::round_up_to_multiple;
use crate::{Error, Result};

/// A reserved range of virtual address space, of which a page-aligned prefix is committed.
///
/// The reservation is released exactly once, when this value is dropped. The committed prefix
/// starts at the base of the reservation and is extended or truncated in whole pages.
#[derive(Debug)]
pub(crate) struct AddressSpace {
    platform: PlatformFacade,

    /// Queried once from the platform when the range is reserved.
    page_size: NonZero<usize>,

    base: NonNull<u8>,

    /// Always a nonzero multiple of the page size.
    reserved_len: usize,

    /// Always a multiple of the page size, never greater than `reserved_len`.
    committed_len: usize,
}

impl AddressSpace {
    /// Reserves `reserved_len` bytes of address space, none of them committed.
    ///
    /// `page_size` is what the caller obtained from `platform`, so the platform is only
    /// asked once per container.
    ///
    /// # Panics
    ///
    /// Panics if `reserved_len` is zero or not a multiple of the page size.
    pub(crate) fn reserve(
        platform: PlatformFacade,
        page_size: NonZero<usize>,
        reserved_len: usize,
    ) -> Result<Self> {
        assert!(
            reserved_len > 0 && reserved_len.is_multiple_of(page_size.get()),
            "reservation of {reserved_len} bytes is not a nonzero multiple of the page size {page_size}"
        );

        let base = platform
            .reserve(reserved_len)
            .map_err(|source| Error::AddressSpace {
                operation: "reserve",
                source,
            })?;

        debug!(
            base = ?base,
            reserved_len,
            page_size = page_size.get(),
            "reserved address space"
        );

        Ok(Self {
            platform,
            page_size,
            base,
            reserved_len,
            committed_len: 0,
        })
    }

    #[must_use]
    pub(crate) fn platform(&self) -> &PlatformFacade {
        &self.platform
    }

    #[must_use]
    pub(crate) fn page_size(&self) -> NonZero<usize> {
        self.page_size
    }

    /// The start of the reservation, which is also the start of the committed prefix.
    #[must_use]
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    #[must_use]
    pub(crate) fn reserved_len(&self) -> usize {
        self.reserved_len
    }

    #[must_use]
    pub(crate) fn committed_len(&self) -> usize {
        self.committed_len
    }

    /// Number of reserved bytes that are not yet committed.
    #[must_use]
    pub(crate) fn uncommitted_len(&self) -> usize {
        // Cannot underflow because the committed prefix never exceeds the reservation.
        self.reserved_len.wrapping_sub(self.committed_len)
    }

    /// Commits at least `len` more bytes, rounded up to whole pages but never beyond the end
    /// of the reservation.
    ///
    /// Returns the number of bytes that were actually committed, which is zero only if `len`
    /// is zero or the reservation is already fully committed.
    pub(crate) fn commit(&mut self, len: usize) -> Result<usize> {
        let len = round_up_to_multiple(len.min(self.uncommitted_len()), self.page_size.get());

        if len == 0 {
            return Ok(0);
        }

        self.platform
            .commit(self.base, self.committed_len, len)
            .map_err(|source| Error::AddressSpace {
                operation: "commit",
                source,
            })?;

        // Cannot overflow because both are bounded by the reservation length.
        self.committed_len = self.committed_len.wrapping_add(len);

        trace!(
            base = ?self.base,
            len,
            committed_len = self.committed_len,
            "committed memory"
        );

        Ok(len)
    }

    /// Decommits the tail of the committed prefix so that only `keep_len` bytes, rounded up
    /// to whole pages, stay committed.
    ///
    /// Does nothing if that would not free at least one page.
    pub(crate) fn decommit_beyond(&mut self, keep_len: usize) -> Result<()> {
        let keep_len =
            round_up_to_multiple(keep_len.min(self.committed_len), self.page_size.get());

        if keep_len >= self.committed_len {
            return Ok(());
        }

        // Cannot underflow, guarded by the check above.
        let release_len = self.committed_len.wrapping_sub(keep_len);

        self.platform
            .decommit(self.base, keep_len, release_len)
            .map_err(|source| Error::AddressSpace {
                operation: "decommit",
                source,
            })?;

        self.committed_len = keep_len;

        debug!(
            base = ?self.base,
            release_len,
            committed_len = self.committed_len,
            "decommitted memory"
        );

        Ok(())
    }
}

impl Drop for AddressSpace {
    fn drop(&mut self) {
        self.platform.release(self.base, self.reserved_len);

        debug!(
            base = ?self.base,
            reserved_len = self.reserved_len,
            "released address space"
        );
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io;

    use mockall::predicate::eq;
    use new_zealand::nz;

    use super::*;
    use crate::pal::MockPlatform;

    fn reserve_fallback(page_size: NonZero<usize>, reserved_len: usize) -> AddressSpace {
        AddressSpace::reserve(
            PlatformFacade::fallback_with_page_size(page_size),
            page_size,
            reserved_len,
        )
        .unwrap()
    }

    #[test]
    fn starts_with_nothing_committed() {
        let space = reserve_fallback(nz!(64), 640);

        assert_eq!(space.page_size().get(), 64);
        assert_eq!(space.reserved_len(), 640);
        assert_eq!(space.committed_len(), 0);
        assert_eq!(space.uncommitted_len(), 640);
    }

    #[test]
    fn commit_rounds_up_to_pages() {
        let mut space = reserve_fallback(nz!(64), 640);

        assert_eq!(space.commit(1).unwrap(), 64);
        assert_eq!(space.committed_len(), 64);

        assert_eq!(space.commit(65).unwrap(), 128);
        assert_eq!(space.committed_len(), 192);
    }

    #[test]
    fn commit_is_clamped_to_reservation() {
        let mut space = reserve_fallback(nz!(64), 256);

        assert_eq!(space.commit(10_000).unwrap(), 256);
        assert_eq!(space.uncommitted_len(), 0);

        // Fully committed, nothing more to give.
        assert_eq!(space.commit(1).unwrap(), 0);
        assert_eq!(space.committed_len(), 256);
    }

    #[test]
    fn commit_zero_is_noop() {
        let mut space = reserve_fallback(nz!(64), 256);

        assert_eq!(space.commit(0).unwrap(), 0);
        assert_eq!(space.committed_len(), 0);
    }

    #[test]
    fn decommit_keeps_whole_pages() {
        let mut space = reserve_fallback(nz!(64), 640);
        space.commit(640).unwrap();

        space.decommit_beyond(65).unwrap();
        assert_eq!(space.committed_len(), 128);

        // Nothing to free, we already keep exactly this much.
        space.decommit_beyond(100).unwrap();
        assert_eq!(space.committed_len(), 128);

        space.decommit_beyond(0).unwrap();
        assert_eq!(space.committed_len(), 0);
    }

    #[test]
    #[should_panic]
    fn reserve_rejects_partial_page() {
        drop(reserve_fallback(nz!(64), 100));
    }

    #[test]
    fn reserve_failure_is_reported() {
        let mut platform = MockPlatform::new();

        platform.expect_page_size().never();
        platform
            .expect_reserve()
            .with(eq(8192))
            .times(1)
            .returning(|_| Err(io::Error::from(io::ErrorKind::OutOfMemory)));
        platform.expect_release().never();

        let result = AddressSpace::reserve(PlatformFacade::from_mock(platform), nz!(4096), 8192);

        assert!(matches!(
            result,
            Err(Error::AddressSpace {
                operation: "reserve",
                ..
            })
        ));
    }

    #[test]
    fn commit_failure_is_reported_and_range_still_released() {
        let mut platform = MockPlatform::new();

        platform.expect_page_size().never();
        platform
            .expect_reserve()
            .times(1)
            .returning(|_| Ok(NonNull::dangling()));
        platform
            .expect_commit()
            .times(1)
            .returning(|_, _, _| Err(io::Error::from(io::ErrorKind::OutOfMemory)));
        platform
            .expect_release()
            .withf(|_, len| *len == 8192)
            .times(1)
            .return_const(());

        let mut space =
            AddressSpace::reserve(PlatformFacade::from_mock(platform), nz!(4096), 8192).unwrap();

        let result = space.commit(100);

        assert!(matches!(
            result,
            Err(Error::AddressSpace {
                operation: "commit",
                ..
            })
        ));
        assert_eq!(space.committed_len(), 0);
    }
}
