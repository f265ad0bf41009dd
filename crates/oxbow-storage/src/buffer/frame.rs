//! Buffer frame - a slot in the buffer pool that holds one page.

use oxbow_common::constants::PAGE_SIZE;
use oxbow_common::types::PageId;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Frame identifier - index into the buffer pool's frame array.
///
/// Stable for the lifetime of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

impl FrameId {
    /// Creates a new frame ID.
    #[inline]
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for FrameId {
    fn from(id: usize) -> Self {
        Self::new(id)
    }
}

impl From<FrameId> for usize {
    fn from(id: FrameId) -> Self {
        id.0
    }
}

/// A frame's page buffer.
///
/// The buffer has its own reader-writer lock so that borrowers holding a
/// [`PageHandle`](super::PageHandle) can read and write page bytes without
/// going through the pool's latches. The frame's bookkeeping (which page it
/// holds, pin count, dirty flag) lives in the pool's latch-protected
/// metadata table, not here.
pub struct Frame {
    /// Frame ID (index in the frame array).
    frame_id: FrameId,
    /// Page data buffer.
    data: RwLock<Box<[u8]>>,
}

impl Frame {
    /// Creates a new zeroed frame.
    pub(crate) fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            data: RwLock::new(vec![0u8; PAGE_SIZE].into_boxed_slice()),
        }
    }

    /// Returns the frame ID.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns a read lock on the page data.
    #[inline]
    pub fn read_data(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.data.read()
    }

    /// Returns a write lock on the page data.
    #[inline]
    pub fn write_data(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.data.write()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("frame_id", &self.frame_id)
            .finish()
    }
}

/// Latch-protected per-frame bookkeeping.
///
/// One record per frame, owned by the pool behind its frame-metadata latch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameMeta {
    /// Page currently occupying this frame, or `INVALID` if the frame is
    /// on the free list.
    pub page_id: PageId,
    /// Number of outstanding borrowers.
    pub pin_count: u32,
    /// True iff the buffer differs from the on-disk image.
    pub is_dirty: bool,
}

impl Default for FrameMeta {
    fn default() -> Self {
        Self {
            page_id: PageId::INVALID,
            pin_count: 0,
            is_dirty: false,
        }
    }
}
