//! Buffer pool manager.
//!
//! The pool maps page ids to a bounded set of in-memory frames. Pages are
//! materialized into a frame on demand, mutated in place by pinned
//! borrowers, and written back when the frame is evicted dirty or
//! explicitly flushed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use oxbow_common::types::PageId;
use parking_lot::Mutex;
use tracing::{error, trace};

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::eviction::ClockReplacer;
use super::frame::{Frame, FrameId, FrameMeta};
use super::handle::PageHandle;
use super::BufferPoolStats;
use crate::disk::DiskManager;
use crate::log::LogManager;

/// Internal statistics with atomic counters.
#[derive(Default)]
struct PoolStatsInner {
    fetches: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    flushes: AtomicU64,
}

/// The buffer pool manager.
///
/// Three latches protect the pool's bookkeeping: the free list (`fl`), the
/// frame-metadata table (`pg`), and the page table (`pt`). Every operation
/// that takes more than one acquires them in the fixed global order
/// `fl → pg → pt`; the replacer's internal lock and the per-frame data
/// locks are leaves underneath. This single order is what makes the pool
/// deadlock-free under concurrent callers.
///
/// Callers must balance every handle returned by
/// [`fetch_page`](Self::fetch_page) / [`new_page`](Self::new_page) with
/// exactly one [`unpin_page`](Self::unpin_page) call; a frame becomes
/// evictable only when its pin count returns to zero.
pub struct BufferPoolManager {
    /// Frame data buffers, one per frame, created once at construction.
    frames: Box<[Frame]>,
    /// Per-frame bookkeeping. This mutex is the `pg` latch.
    meta: Mutex<Box<[FrameMeta]>>,
    /// Maps resident page ids to frames. This mutex is the `pt` latch.
    page_table: Mutex<HashMap<PageId, FrameId>>,
    /// Frames not holding any page. This mutex is the `fl` latch.
    free_list: Mutex<VecDeque<FrameId>>,
    /// Eviction candidate bookkeeping.
    replacer: ClockReplacer,
    /// Stable storage underneath the pool.
    disk: Arc<dyn DiskManager>,
    /// Optional write-ahead log sink. Held for collaborators layered on
    /// the pool; the pool itself never appends to it.
    log_manager: Option<Arc<LogManager>>,
    /// Statistics counters.
    stats: PoolStatsInner,
}

impl BufferPoolManager {
    /// Creates a pool with `config.num_frames` frames, all initially free.
    pub fn new(
        config: BufferPoolConfig,
        disk: Arc<dyn DiskManager>,
        log_manager: Option<Arc<LogManager>>,
    ) -> BufferResult<Self> {
        config.validate().map_err(|e| BufferError::Config {
            message: e.to_string(),
        })?;

        let num_frames = config.num_frames;
        let frames: Box<[Frame]> = (0..num_frames).map(|i| Frame::new(FrameId::new(i))).collect();
        let free_list: VecDeque<FrameId> = (0..num_frames).map(FrameId::new).collect();

        Ok(Self {
            frames,
            meta: Mutex::new(vec![FrameMeta::default(); num_frames].into_boxed_slice()),
            page_table: Mutex::new(HashMap::with_capacity(num_frames)),
            free_list: Mutex::new(free_list),
            replacer: ClockReplacer::new(num_frames),
            disk,
            log_manager,
            stats: PoolStatsInner::default(),
        })
    }

    /// Fetches a page, reading it from disk if it is not resident.
    ///
    /// The returned handle holds a pin; release it with
    /// [`unpin_page`](Self::unpin_page). Fails with
    /// [`BufferError::NoFreeFrames`] when the page is not resident and
    /// every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<PageHandle<'_>> {
        if !page_id.is_valid() {
            return Err(BufferError::InvalidPageId { page_id });
        }
        self.stats.fetches.fetch_add(1, Ordering::Relaxed);

        let mut free_list = self.free_list.lock();
        let mut meta = self.meta.lock();
        let mut page_table = self.page_table.lock();

        if let Some(&frame_id) = page_table.get(&page_id) {
            self.replacer.pin(frame_id);
            meta[frame_id.index()].pin_count += 1;
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(PageHandle::new(&self.frames[frame_id.index()], page_id));
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.take_victim_frame(&mut free_list, &mut meta, &mut page_table)?;
        drop(free_list);

        let slot = &mut meta[frame_id.index()];
        slot.page_id = page_id;
        slot.pin_count = 1;
        slot.is_dirty = false;
        page_table.insert(page_id, frame_id);

        {
            let mut data = self.frames[frame_id.index()].write_data();
            self.disk.read_page(page_id, &mut data[..])?;
        }

        self.replacer.pin(frame_id);
        Ok(PageHandle::new(&self.frames[frame_id.index()], page_id))
    }

    /// Allocates a fresh page on disk and pins it in a zeroed frame.
    ///
    /// Fails with [`BufferError::NoFreeFrames`] when every frame is pinned.
    pub fn new_page(&self) -> BufferResult<PageHandle<'_>> {
        let mut free_list = self.free_list.lock();
        let mut meta = self.meta.lock();
        let mut page_table = self.page_table.lock();

        let frame_id = self.take_victim_frame(&mut free_list, &mut meta, &mut page_table)?;
        drop(free_list);

        let page_id = self.disk.allocate_page();
        self.frames[frame_id.index()].write_data().fill(0);

        let slot = &mut meta[frame_id.index()];
        slot.page_id = page_id;
        slot.pin_count = 1;
        slot.is_dirty = false;
        page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);

        trace!(page_id = %page_id, frame_id = frame_id.index(), "new page");
        Ok(PageHandle::new(&self.frames[frame_id.index()], page_id))
    }

    /// Releases one pin on a page, recording whether the borrower wrote it.
    ///
    /// Unpinning a page that is not resident succeeds trivially. Unpinning
    /// a page whose pin count is already zero fails with
    /// [`BufferError::NotPinned`] and does not decrement.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()> {
        let mut meta = self.meta.lock();
        let page_table = self.page_table.lock();

        let Some(&frame_id) = page_table.get(&page_id) else {
            return Ok(());
        };

        let slot = &mut meta[frame_id.index()];
        if slot.pin_count == 0 {
            error!(page_id = %page_id, "unpin of a page with zero pin count");
            return Err(BufferError::NotPinned { page_id });
        }

        slot.pin_count -= 1;
        slot.is_dirty |= is_dirty;
        if slot.pin_count == 0 {
            self.replacer.unpin(frame_id);
        }
        Ok(())
    }

    /// Writes a resident page's buffer back to disk if it is dirty.
    ///
    /// Flushing does not evict. Fails with [`BufferError::PageNotFound`]
    /// if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        let mut meta = self.meta.lock();
        let page_table = self.page_table.lock();

        let Some(&frame_id) = page_table.get(&page_id) else {
            return Err(BufferError::PageNotFound { page_id });
        };

        let slot = &mut meta[frame_id.index()];
        if slot.is_dirty {
            let data = self.frames[frame_id.index()].read_data();
            self.disk.write_page(page_id, &data[..])?;
            slot.is_dirty = false;
            self.stats.flushes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Removes a page from the pool and releases its id at the disk
    /// manager.
    ///
    /// Deleting a page that is not resident succeeds (it is already gone
    /// as far as the pool is concerned). Fails with
    /// [`BufferError::PagePinned`] while borrowers are outstanding.
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        if !page_id.is_valid() {
            return Ok(());
        }

        let mut free_list = self.free_list.lock();
        let mut meta = self.meta.lock();
        let mut page_table = self.page_table.lock();

        let Some(&frame_id) = page_table.get(&page_id) else {
            return Ok(());
        };

        let slot = &mut meta[frame_id.index()];
        if slot.pin_count != 0 {
            error!(page_id = %page_id, pin_count = slot.pin_count, "delete of a pinned page");
            return Err(BufferError::PagePinned {
                page_id,
                pin_count: slot.pin_count,
            });
        }

        self.disk.deallocate_page(page_id)?;
        page_table.remove(&page_id);
        slot.page_id = PageId::INVALID;
        slot.is_dirty = false;
        // The frame leaves the candidate set along with the page table.
        self.replacer.pin(frame_id);
        free_list.push_back(frame_id);
        Ok(())
    }

    /// Writes every dirty resident page back to disk.
    ///
    /// Returns the number of pages flushed.
    pub fn flush_all_pages(&self) -> BufferResult<usize> {
        let mut meta = self.meta.lock();
        let mut flushed = 0;

        for (i, slot) in meta.iter_mut().enumerate() {
            if slot.page_id.is_valid() && slot.is_dirty {
                let data = self.frames[i].read_data();
                self.disk.write_page(slot.page_id, &data[..])?;
                slot.is_dirty = false;
                flushed += 1;
            }
        }

        self.stats.flushes.fetch_add(flushed as u64, Ordering::Relaxed);
        Ok(flushed)
    }

    /// Returns true if the page is resident.
    #[must_use]
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.lock().contains_key(&page_id)
    }

    /// Returns the number of frames in the pool.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Returns the log sink this pool was constructed with, if any.
    #[must_use]
    pub fn log_manager(&self) -> Option<&Arc<LogManager>> {
        self.log_manager.as_ref()
    }

    /// Returns a snapshot of the pool's statistics.
    #[must_use]
    pub fn stats(&self) -> BufferPoolStats {
        let meta = self.meta.lock();
        let pinned = meta.iter().filter(|m| m.pin_count > 0).count();
        let dirty = meta.iter().filter(|m| m.is_dirty).count();

        BufferPoolStats {
            fetches: self.stats.fetches.load(Ordering::Relaxed),
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            flushes: self.stats.flushes.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    /// Picks a frame to hold an incoming page: the free list first, the
    /// replacer otherwise. An evicted frame has its dirty contents written
    /// back and its old mapping removed before it is handed out.
    ///
    /// Callers must already hold all three pool latches.
    fn take_victim_frame(
        &self,
        free_list: &mut VecDeque<FrameId>,
        meta: &mut [FrameMeta],
        page_table: &mut HashMap<PageId, FrameId>,
    ) -> BufferResult<FrameId> {
        if let Some(frame_id) = free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.victim().ok_or(BufferError::NoFreeFrames)?;
        let evicted = meta[frame_id.index()].page_id;

        if meta[frame_id.index()].is_dirty {
            let data = self.frames[frame_id.index()].read_data();
            self.disk.write_page(evicted, &data[..])?;
            meta[frame_id.index()].is_dirty = false;
            self.stats.flushes.fetch_add(1, Ordering::Relaxed);
        }

        page_table.remove(&evicted);
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        trace!(page_id = %evicted, frame_id = frame_id.index(), "evicted page");
        Ok(frame_id)
    }
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("pool_size", &self.frames.len())
            .field("resident_pages", &self.page_table.lock().len())
            .finish()
    }
}
