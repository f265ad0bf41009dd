//! Minimal append-only log sink.
//!
//! The buffer pool can hold a [`LogManager`] as a collaborator. Records are
//! length-prefixed and assigned monotonically increasing LSNs; durability
//! is explicit via [`flush`](LogManager::flush). Recovery and segmentation
//! are out of scope.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use oxbow_common::types::Lsn;
use parking_lot::Mutex;
use thiserror::Error;

/// Result type for log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur during log operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// I/O error while appending or flushing.
    #[error("log I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to create the log file.
    #[error("failed to create log file {path}: {source}")]
    Create {
        /// Path of the log file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Append-only log sink.
pub struct LogManager {
    /// Path of the log file.
    path: PathBuf,
    /// The log file, serialized behind a mutex.
    file: Mutex<File>,
    /// Next LSN to assign.
    next_lsn: AtomicU64,
}

impl LogManager {
    /// Creates (or truncates) the log file at `path`.
    pub fn create(path: impl AsRef<Path>) -> LogResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| LogError::Create {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            next_lsn: AtomicU64::new(Lsn::FIRST.as_u64()),
        })
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the next LSN that will be assigned.
    #[must_use]
    pub fn next_lsn(&self) -> Lsn {
        Lsn::new(self.next_lsn.load(Ordering::Acquire))
    }

    /// Appends a record and returns its LSN.
    ///
    /// The record is buffered by the OS; call [`flush`](Self::flush) to
    /// force it to the storage medium.
    pub fn append(&self, record: &[u8]) -> LogResult<Lsn> {
        let mut file = self.file.lock();
        file.write_all(&(record.len() as u32).to_le_bytes())?;
        file.write_all(record)?;
        let lsn = self.next_lsn.fetch_add(1, Ordering::AcqRel);
        Ok(Lsn::new(lsn))
    }

    /// Forces appended records down to the storage medium.
    pub fn flush(&self) -> LogResult<()> {
        self.file.lock().sync_data()?;
        Ok(())
    }
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("path", &self.path)
            .field("next_lsn", &self.next_lsn())
            .finish()
    }
}
