//! Pool statistics

use core::fmt;

/// Point-in-time snapshot of one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Size of each block
    pub block_size: usize,
    /// Blocks carved out of each chunk
    pub blocks_per_chunk: usize,
    /// Chunks registered by the pool
    pub chunks: usize,
    /// Blocks on the free list
    pub free_blocks: usize,
    /// Blocks handed out and not yet returned
    pub outstanding: usize,
    /// Handles sharing the pool
    pub refcount: usize,
}

impl PoolStats {
    /// Total blocks across all registered chunks
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.chunks * self.blocks_per_chunk
    }

    /// Bytes held by outstanding blocks
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.outstanding * self.block_size
    }

    /// Share of capacity currently handed out, in `0.0..=1.0`
    #[must_use]
    pub fn utilization(&self) -> f64 {
        match self.capacity() {
            0 => 0.0,
            capacity => self.outstanding as f64 / capacity as f64,
        }
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} blocks in use ({} chunks of {} x {}B), {} handles",
            self.outstanding,
            self.capacity(),
            self.chunks,
            self.blocks_per_chunk,
            self.block_size,
            self.refcount
        )
    }
}
