#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A growable sequence container backed by reserved virtual address space.
//!
//! [`VirtualVec`] reserves a large range of address space up front (1 GiB by default) and commits
//! physical memory to it in whole pages as elements are added. Unlike [`Vec`], it never
//! reallocates: elements stay at the same address for the lifetime of the container and growth
//! never copies or moves existing elements.
//!
//! # Key Features
//!
//! - **Stable storage**: the start of the storage never moves, growth only commits more pages
//! - **Page-granular growth**: capacity is always derived from whole committed pages
//! - **Explicit failure**: operations that may grow return a [`Result`] instead of aborting
//! - **Instrumentable element lifecycle**: elements are constructed, assigned and dropped in a
//!   documented order, one at a time
//!
//! # Basic Usage
//!
//! ```rust
//! use virtual_vec::VirtualVec;
//!
//! let mut values = VirtualVec::new();
//!
//! for i in 0..10_u32 {
//!     values.push(i)?;
//! }
//!
//! // Capacity is a whole number of pages worth of elements.
//! assert!(values.capacity() >= 10);
//! assert_eq!(values.capacity() * size_of::<u32>() % values.page_size(), 0);
//!
//! // Order-preserving removal.
//! values.erase_range(2, 4)?;
//! assert_eq!(values[2], 5);
//!
//! // Constant-time removal that moves the last element into the hole.
//! values.erase_by_swap(0)?;
//! assert_eq!(values[0], 9);
//! # Ok::<(), virtual_vec::Error>(())
//! ```
//!
//! # Limited reservations
//!
//! The maximum size of the container is fixed when it is created. Use the builder to reserve
//! less (or more) than the default:
//!
//! ```rust
//! use virtual_vec::{Error, VirtualVec};
//!
//! let mut values = VirtualVec::<u64>::builder()
//!     .max_bytes(values_per_page() * size_of::<u64>())
//!     .build()?;
//!
//! values.resize_default(values.max_capacity())?;
//!
//! assert!(matches!(values.push(1), Err(Error::CapacityExceeded { .. })));
//! # fn values_per_page() -> usize { 65536 / size_of::<u64>() }
//! # Ok::<(), virtual_vec::Error>(())
//! ```
//!
//! # Logging
//!
//! Reservations, releases and decommits are logged as `tracing` events at the debug level.
//! Individual commits are logged at the trace level.

mod address_space;
mod builder;
mod error;
mod pal;
mod rounding;
mod vec;

pub use builder::*;
pub use error::*;
pub use vec::*;
