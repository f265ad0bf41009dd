//! Buffer Pool Manager for Oxbow.
//!
//! The buffer pool manages a fixed-size pool of in-memory page frames,
//! providing cached access to disk pages:
//!
//! - **Page Caching**: keep recently used pages in memory
//! - **Pin/Unpin**: reference counting so a borrowed frame is never recycled
//! - **Dirty Tracking**: modified pages are written back before reuse
//! - **Eviction Policy**: CLOCK (second-chance) replacement
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                 BufferPoolManager                  │
//! │   page_table: PageId -> FrameId        (pt latch)  │
//! │   frame metadata: pin count / dirty    (pg latch)  │
//! │   free_list: unused frames             (fl latch)  │
//! │                                                    │
//! │   ┌─────────┐ ┌─────────┐       ┌─────────┐        │
//! │   │ Frame 0 │ │ Frame 1 │  ...  │ Frame N │        │
//! │   │ data[]  │ │ data[]  │       │ data[]  │        │
//! │   └─────────┘ └─────────┘       └─────────┘        │
//! │                                                    │
//! │   ClockReplacer: eviction candidates               │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation that takes more than one pool latch acquires them in the
//! fixed order free list → frame metadata → page table.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use oxbow_storage::buffer::{BufferPoolConfig, BufferPoolManager};
//! use oxbow_storage::disk::FileDiskManager;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let disk = Arc::new(FileDiskManager::open("data.db")?);
//! let pool = BufferPoolManager::new(BufferPoolConfig::new(64), disk, None)?;
//!
//! let page = pool.new_page()?;
//! let page_id = page.page_id();
//! page.data_mut()[0] = 0xAB;
//!
//! // Fetch and unpin are paired explicitly.
//! pool.unpin_page(page_id, true)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod eviction;
mod frame;
mod handle;
mod pool;

pub use config::BufferPoolConfig;
pub use error::{BufferError, BufferResult};
pub use eviction::ClockReplacer;
pub use frame::{Frame, FrameId};
pub use handle::PageHandle;
pub use pool::BufferPoolManager;

/// Statistics for buffer pool monitoring.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of page fetches.
    pub fetches: u64,
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (required disk read).
    pub misses: u64,
    /// Number of pages evicted.
    pub evictions: u64,
    /// Number of dirty pages flushed.
    pub flushes: u64,
    /// Current number of pinned frames.
    pub pinned_frames: usize,
    /// Current number of dirty frames.
    pub dirty_frames: usize,
}

impl BufferPoolStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_hit_ratio() {
        let mut stats = BufferPoolStats::default();
        assert_eq!(stats.hit_ratio(), 0.0);

        stats.fetches = 100;
        stats.hits = 80;
        assert!((stats.hit_ratio() - 0.8).abs() < f64::EPSILON);
    }
}
