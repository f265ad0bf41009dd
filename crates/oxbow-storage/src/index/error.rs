//! Hash index errors.

use thiserror::Error;

use crate::buffer::BufferError;
use crate::page::HEADER_BLOCK_CAPACITY;

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur during hash index operations.
///
/// A miss or a full bucket is not an error; those surface as empty results
/// and `false` returns. Errors here mean the index could not run the
/// operation at all.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The buffer pool failed underneath the index.
    #[error("buffer pool error: {0}")]
    Buffer(#[from] BufferError),

    /// The requested bucket count cannot be recorded in one header page.
    #[error("invalid bucket count {got}, expected 1..={max}", max = HEADER_BLOCK_CAPACITY)]
    InvalidBucketCount {
        /// The requested bucket count.
        got: usize,
    },
}
