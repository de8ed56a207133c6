//! Error type shared by every fallible table operation.

use thiserror::Error;

/// Failure reported by a [`Table`](crate::Table) operation.
///
/// Absence on the query side (`lookup`, `has_key`) is not an error; it is
/// reported through `Option` / `bool`. Only mutations that require a key
/// to exist report [`TableError::NotFound`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A constructor or configuration argument is unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A requested bucket count lies outside what the table can address.
    #[error("bucket count {requested} outside supported range {min}..={max}")]
    CapacityOutOfRange {
        /// Bucket count that was asked for.
        requested: usize,
        /// Smallest bucket count the table accepts (its floor).
        min: usize,
        /// Largest bucket count the 16-bit hash can address.
        max: usize,
    },

    /// The bucket array could not be allocated. The table is unchanged.
    #[error("out of memory allocating {buckets} buckets")]
    OutOfMemory {
        /// Bucket count of the allocation that failed.
        buckets: usize,
    },

    /// The key is not present.
    #[error("key not found")]
    NotFound,
}
