use std::fmt::Debug;
use std::io;
use std::num::NonZero;
use std::ptr::NonNull;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::MockPlatform;
#[cfg(test)]
use crate::pal::fallback::FallbackPlatform;
use crate::pal::{BUILD_TARGET_PLATFORM, BuildTargetPlatform, Platform};

/// Enum to hide the real/fallback/mock choice behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum PlatformFacade {
    Target(&'static BuildTargetPlatform),

    #[cfg(test)]
    Fallback(Arc<FallbackPlatform>),

    #[cfg(test)]
    Mock(Arc<MockPlatform>),
}

impl PlatformFacade {
    pub(crate) fn target() -> Self {
        Self::Target(&BUILD_TARGET_PLATFORM)
    }

    #[cfg(test)]
    pub(crate) fn fallback_with_page_size(page_size: NonZero<usize>) -> Self {
        Self::Fallback(Arc::new(FallbackPlatform::with_page_size(page_size)))
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockPlatform) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Platform for PlatformFacade {
    fn page_size(&self) -> NonZero<usize> {
        match self {
            Self::Target(p) => p.page_size(),
            #[cfg(test)]
            Self::Fallback(p) => p.page_size(),
            #[cfg(test)]
            Self::Mock(p) => p.page_size(),
        }
    }

    fn reserve(&self, len: usize) -> Result<NonNull<u8>, io::Error> {
        match self {
            Self::Target(p) => p.reserve(len),
            #[cfg(test)]
            Self::Fallback(p) => p.reserve(len),
            #[cfg(test)]
            Self::Mock(p) => p.reserve(len),
        }
    }

    fn commit(
        &self,
        base: NonNull<u8>,
        offset: usize,
        len: usize,
    ) -> Result<NonNull<u8>, io::Error> {
        match self {
            Self::Target(p) => p.commit(base, offset, len),
            #[cfg(test)]
            Self::Fallback(p) => p.commit(base, offset, len),
            #[cfg(test)]
            Self::Mock(p) => p.commit(base, offset, len),
        }
    }

    fn decommit(&self, base: NonNull<u8>, offset: usize, len: usize) -> Result<(), io::Error> {
        match self {
            Self::Target(p) => p.decommit(base, offset, len),
            #[cfg(test)]
            Self::Fallback(p) => p.decommit(base, offset, len),
            #[cfg(test)]
            Self::Mock(p) => p.decommit(base, offset, len),
        }
    }

    fn release(&self, base: NonNull<u8>, len: usize) {
        match self {
            Self::Target(p) => p.release(base, len),
            #[cfg(test)]
            Self::Fallback(p) => p.release(base, len),
            #[cfg(test)]
            Self::Mock(p) => p.release(base, len),
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl Debug for PlatformFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Fallback(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
