//! Platform Abstraction Layer (PAL). Everything that talks to the operating system about
//! virtual memory lives here, so the container itself stays platform-agnostic.

mod abstractions;
pub(crate) use abstractions::*;

mod facade;
pub(crate) use facade::*;

#[cfg(all(unix, not(miri)))]
mod unix;
#[cfg(all(unix, not(miri)))]
pub(crate) use unix::*;

#[cfg(all(windows, not(miri)))]
mod windows;
#[cfg(all(windows, not(miri)))]
pub(crate) use windows::*;

// The fallback module is compiled in test mode on all platforms, under Miri, and as the primary
// implementation on unsupported platforms. We only glob-import it when it is the primary
// implementation. In test mode on supported platforms it is accessed via `fallback::`.
#[cfg(any(test, miri, not(any(unix, windows))))]
pub(crate) mod fallback;

#[cfg(any(miri, not(any(unix, windows))))]
pub(crate) use fallback::*;
