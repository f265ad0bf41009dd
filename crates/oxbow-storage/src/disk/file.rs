//! File-backed disk manager.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use oxbow_common::constants::PAGE_SIZE;
use oxbow_common::types::PageId;
use parking_lot::Mutex;
use tracing::trace;

use super::error::{DiskError, DiskResult};
use super::DiskManager;

/// Disk manager backed by a single data file.
///
/// Page `n` lives at byte offset `n * PAGE_SIZE`. The allocation cursor is
/// recovered from the file length on open, so reopening a data file
/// continues allocating past the highest page ever written.
pub struct FileDiskManager {
    /// Path of the data file.
    path: PathBuf,
    /// The data file, serialized behind a mutex.
    file: Mutex<File>,
    /// Next page id to hand out.
    next_page_id: AtomicU32,
}

impl FileDiskManager {
    /// Opens (or creates) the data file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| DiskError::Open {
                path: path.clone(),
                source,
            })?;

        let len = file.metadata()?.len();
        let next_page_id = len.div_ceil(PAGE_SIZE as u64) as u32;

        Ok(Self {
            path,
            file: Mutex::new(file),
            next_page_id: AtomicU32::new(next_page_id),
        })
    }

    /// Returns the data file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of page ids handed out so far.
    #[must_use]
    pub fn allocated_pages(&self) -> u32 {
        self.next_page_id.load(Ordering::Relaxed)
    }

    /// Forces buffered writes down to the storage medium.
    pub fn sync(&self) -> DiskResult<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }

    #[inline]
    fn offset(page_id: PageId) -> u64 {
        u64::from(page_id.as_u32()) * PAGE_SIZE as u64
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(Self::offset(page_id)))?;

        // The page may extend past the end of the file if it was allocated
        // but never written; the unwritten tail reads as zeroes.
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buf[filled..].fill(0);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> DiskResult<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn allocate_page(&self) -> PageId {
        PageId::new(self.next_page_id.fetch_add(1, Ordering::Relaxed))
    }

    fn deallocate_page(&self, page_id: PageId) -> DiskResult<()> {
        if page_id.as_u32() >= self.next_page_id.load(Ordering::Relaxed) {
            return Err(DiskError::UnknownPage { page_id });
        }
        // Ids are never recycled and the file is not shrunk; the release is
        // recorded for observability only.
        trace!(page_id = %page_id, "page deallocated");
        Ok(())
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("path", &self.path)
            .field("allocated_pages", &self.allocated_pages())
            .finish()
    }
}
