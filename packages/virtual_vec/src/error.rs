use std::io;

use thiserror::Error;

/// Errors that can occur when operating on a [`VirtualVec`][crate::VirtualVec].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An index did not refer to a live element.
    #[error("index {index} is out of bounds for a container of length {len}")]
    IndexOutOfBounds {
        /// The index that was requested.
        index: usize,

        /// The number of live elements at the time of the request.
        len: usize,
    },

    /// A ranged erase was given an end index smaller than its start index.
    #[error("invalid range: last index {last} is smaller than first index {first}")]
    InvalidRange {
        /// The first index of the requested range.
        first: usize,

        /// The last index (inclusive) of the requested range.
        last: usize,
    },

    /// The request needs more element slots than the reserved address space can ever hold.
    #[error(
        "requested capacity of {requested} elements exceeds the maximum capacity of {max_capacity}"
    )]
    CapacityExceeded {
        /// The number of element slots that were needed.
        requested: usize,

        /// The number of element slots that fit into the reserved address space.
        max_capacity: usize,
    },

    /// The operating system refused a virtual memory operation.
    #[error("failed to {operation} virtual memory")]
    AddressSpace {
        /// The operation that failed, e.g. "reserve" or "commit".
        operation: &'static str,

        /// The error reported by the operating system.
        #[source]
        source: io::Error,
    },
}

/// A specialized `Result` type for container operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
