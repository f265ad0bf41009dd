//! Disk manager errors.

use std::io;
use std::path::PathBuf;

use oxbow_common::types::PageId;
use thiserror::Error;

/// Result type for disk operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur during disk operations.
#[derive(Debug, Error)]
pub enum DiskError {
    /// I/O error during page read/write.
    #[error("disk I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Failed to open the data file.
    #[error("failed to open data file {path}: {source}")]
    Open {
        /// Path of the data file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A page id outside the allocated range was passed in.
    #[error("page {page_id} has not been allocated")]
    UnknownPage {
        /// The offending page id.
        page_id: PageId,
    },
}
