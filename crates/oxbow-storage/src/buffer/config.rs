//! Buffer pool configuration.

use oxbow_common::constants::{DEFAULT_POOL_SIZE, MIN_POOL_SIZE, PAGE_SIZE};

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames in the buffer pool.
    pub num_frames: usize,
}

impl BufferPoolConfig {
    /// Creates a new configuration with the specified number of frames.
    #[must_use]
    pub fn new(num_frames: usize) -> Self {
        Self { num_frames }
    }

    /// Creates a configuration from a memory size in bytes.
    #[must_use]
    pub fn from_memory_size(memory_bytes: usize) -> Self {
        Self::new((memory_bytes / PAGE_SIZE).max(MIN_POOL_SIZE))
    }

    /// Returns the total memory used by the frame buffers.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.num_frames * PAGE_SIZE
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.num_frames < MIN_POOL_SIZE {
            return Err("num_frames must be > 0");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
