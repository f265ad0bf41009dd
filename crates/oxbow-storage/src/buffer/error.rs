//! Buffer pool errors.

use oxbow_common::types::PageId;
use thiserror::Error;

use crate::disk::DiskError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
///
/// All of these are local to the failed operation; none poison the pool.
#[derive(Debug, Error)]
pub enum BufferError {
    /// No frame is available: the free list is empty and every occupied
    /// frame is pinned.
    #[error("no free frames available, all pages are pinned")]
    NoFreeFrames,

    /// Page not resident in the buffer pool.
    #[error("page {page_id} not found in buffer pool")]
    PageNotFound {
        /// The page id that was not resident.
        page_id: PageId,
    },

    /// Invalid page ID.
    #[error("invalid page ID: {page_id}")]
    InvalidPageId {
        /// The offending page id.
        page_id: PageId,
    },

    /// Unpin of a page whose pin count is already zero.
    #[error("page {page_id} is not pinned")]
    NotPinned {
        /// The page id whose pin count was already zero.
        page_id: PageId,
    },

    /// Delete of a page that still has borrowers.
    #[error("page {page_id} is pinned ({pin_count} outstanding)")]
    PagePinned {
        /// The page id that is still borrowed.
        page_id: PageId,
        /// Outstanding pin count at the time of the call.
        pin_count: u32,
    },

    /// Disk I/O failed underneath the pool.
    #[error("disk error: {0}")]
    Disk(#[from] DiskError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong with the configuration.
        message: String,
    },
}
