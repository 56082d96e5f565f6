//! Error types for bucketing operations

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bucketing operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bucket width below the supported minimum
    #[error("bucket width must be at least 3, got {0}")]
    InvalidBucketWidth(u64),

    /// Identifier generation ran out of collision re-rolls
    #[error("could not draw a fresh bucket identifier after {0} attempts")]
    IdSpaceExhausted(u32),

    /// Positional access outside the current index bounds
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested position
        index: usize,
        /// Index length at the time of access
        len: usize,
    },
}
