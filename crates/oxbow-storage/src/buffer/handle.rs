//! Page handles for frames borrowed from the buffer pool.

use oxbow_common::types::PageId;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::frame::{Frame, FrameId};

/// A pinned page borrowed from the buffer pool.
///
/// Returned by [`fetch_page`](super::BufferPoolManager::fetch_page) and
/// [`new_page`](super::BufferPoolManager::new_page). While the handle's pin
/// is outstanding the frame cannot be evicted, so the data accessors are
/// safe against reuse.
///
/// Fetch and unpin are deliberately separate operations: dropping the
/// handle does **not** release the pin. Every handle must be balanced with
/// exactly one [`unpin_page`](super::BufferPoolManager::unpin_page) call,
/// passing `true` if the page bytes were modified.
pub struct PageHandle<'a> {
    frame: &'a Frame,
    page_id: PageId,
}

impl<'a> PageHandle<'a> {
    pub(crate) fn new(frame: &'a Frame, page_id: PageId) -> Self {
        Self { frame, page_id }
    }

    /// Returns the id of the page this handle pins.
    #[inline]
    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the frame the page resides in.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id()
    }

    /// Returns a read lock on the page bytes.
    #[inline]
    pub fn data(&self) -> RwLockReadGuard<'a, Box<[u8]>> {
        self.frame.read_data()
    }

    /// Returns a write lock on the page bytes.
    ///
    /// Writing through this guard does not mark the page dirty by itself;
    /// report the modification through `unpin_page(page_id, true)`.
    #[inline]
    pub fn data_mut(&self) -> RwLockWriteGuard<'a, Box<[u8]>> {
        self.frame.write_data()
    }
}

impl std::fmt::Debug for PageHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandle")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame.frame_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_accessors() {
        let frame = Frame::new(FrameId::new(2));
        let handle = PageHandle::new(&frame, PageId::new(9));

        assert_eq!(handle.page_id(), PageId::new(9));
        assert_eq!(handle.frame_id(), FrameId::new(2));

        handle.data_mut()[0] = 0x5A;
        assert_eq!(handle.data()[0], 0x5A);
    }
}
