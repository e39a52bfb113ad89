//! Shared pool state
//!
//! # Safety
//!
//! A [`PoolGroup`] owns the chunks in its registry and hands out raw block
//! addresses from them:
//! - Blocks on the free list are not owned by any caller
//! - Blocks off the free list belong to callers until deallocated
//! - Chunks leave the registry only through [`PoolGroup::drain`], which moves
//!   them to the global cache
//!
//! ## Invariants
//!
//! - Every free-list entry is a block of a chunk reachable from `chunk_head`
//! - `outstanding` counts blocks handed out and not yet returned
//! - `free.len() + outstanding == chunk_count * blocks_per_chunk` as long as
//!   callers honour the deallocation contract

use core::cell::RefCell;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::debug;

use super::PoolConfig;
use crate::chunk::{GlobalChunkCache, RawChunk};
use crate::core::ChunkLayout;
use crate::error::MemoryResult;

/// Free list, chunk registry and counters of one pool
#[derive(Debug, Default)]
struct PoolState {
    /// Available blocks, next to hand out on top
    free: Vec<NonNull<u8>>,
    /// Most recently registered chunk; older ones follow the trailing links
    chunk_head: Option<RawChunk>,
    chunk_count: usize,
    outstanding: usize,
}

/// State shared by every allocator handle attached to one pool
#[derive(Debug)]
pub(crate) struct PoolGroup {
    layout: ChunkLayout,
    config: PoolConfig,
    state: RefCell<PoolState>,
}

impl PoolGroup {
    pub(crate) fn new(layout: ChunkLayout, config: PoolConfig) -> Self {
        Self {
            layout,
            config,
            state: RefCell::new(PoolState::default()),
        }
    }

    #[inline]
    pub(crate) fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    #[inline]
    pub(crate) fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Registers one more chunk and puts all of its blocks on the free list
    fn grow(&self, state: &mut PoolState) -> MemoryResult<()> {
        let chunk = GlobalChunkCache::acquire(&self.layout)?;

        // SAFETY: the chunk was just handed to us by the cache, nobody else owns it.
        unsafe { chunk.set_next(&self.layout, state.chunk_head) };
        state.chunk_head = Some(chunk);
        state.chunk_count += 1;

        // Reverse order so the first block of the chunk is handed out first
        let blocks = self.layout.blocks_per_chunk();
        state.free.reserve(blocks);
        for index in (0..blocks).rev() {
            state.free.push(chunk.block(&self.layout, index));
        }

        Ok(())
    }

    /// Takes one block, growing the pool when the free list is empty
    pub(crate) fn allocate_block(&self) -> MemoryResult<NonNull<u8>> {
        let mut state = self.state.borrow_mut();

        if state.free.is_empty() {
            self.grow(&mut state)?;
        }

        let Some(block) = state.free.pop() else {
            unreachable!("grow always adds at least one block");
        };
        state.outstanding += 1;

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: the block was free, so it is block_size bytes nobody else uses.
            unsafe { ptr::write_bytes(block.as_ptr(), pattern, self.layout.block_size()) };
        }

        Ok(block)
    }

    /// Puts a block back on the free list.
    ///
    /// # Safety
    ///
    /// `block` must have been returned by [`allocate_block`](Self::allocate_block)
    /// on this group, must not have been returned since, and must not be used
    /// afterwards.
    pub(crate) unsafe fn deallocate_block(&self, block: NonNull<u8>) {
        if self.config.verify_ownership {
            assert!(
                self.owns(block.as_ptr()),
                "block {block:p} does not belong to this pool"
            );
        }

        let mut state = self.state.borrow_mut();

        debug_assert!(
            state.outstanding > 0,
            "block {block:p} deallocated without a matching allocation"
        );
        state.outstanding = state.outstanding.saturating_sub(1);

        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: the caller hands the block back, so we own its bytes again.
            unsafe { ptr::write_bytes(block.as_ptr(), pattern, self.layout.block_size()) };
        }

        state.free.push(block);
    }

    /// Whether `ptr` is the start of a block in one of this pool's chunks.
    ///
    /// Walks the whole chunk registry.
    pub(crate) fn owns(&self, ptr: *const u8) -> bool {
        let state = self.state.borrow();
        let mut cursor = state.chunk_head;

        while let Some(chunk) = cursor {
            if chunk.contains_block(&self.layout, ptr) {
                return true;
            }
            // SAFETY: registered chunks are live and their links were set in grow.
            cursor = unsafe { chunk.next(&self.layout) };
        }
        false
    }

    /// Retires every chunk to the global cache and forgets all blocks.
    ///
    /// Returns the number of chunks retired. Values still constructed in
    /// outstanding blocks are not dropped.
    pub(crate) fn drain(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let mut cursor = state.chunk_head.take();
        let mut retired = 0;

        while let Some(chunk) = cursor {
            // SAFETY: read the link before the chunk changes hands.
            cursor = unsafe { chunk.next(&self.layout) };
            GlobalChunkCache::retire(&self.layout, chunk);
            retired += 1;
        }
        debug_assert_eq!(retired, state.chunk_count);

        state.free.clear();
        state.chunk_count = 0;
        state.outstanding = 0;

        #[cfg(feature = "logging")]
        if retired > 0 {
            debug!(layout = %self.layout, retired, "drained pool chunks to cache");
        }

        retired
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.state.borrow().outstanding
    }

    pub(crate) fn free_blocks(&self) -> usize {
        self.state.borrow().free.len()
    }

    pub(crate) fn chunk_count(&self) -> usize {
        self.state.borrow().chunk_count
    }
}

impl Drop for PoolGroup {
    fn drop(&mut self) {
        self.drain();
    }
}
