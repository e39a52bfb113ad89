//! Raw chunk buffers
//!
//! # Safety
//!
//! A [`RawChunk`] is the address of a heap buffer allocated with
//! [`ChunkLayout::heap_layout`]. It is `Copy` and carries no lifetime: whoever
//! holds it in a pool's chunk registry or in the global chunk cache owns the
//! buffer, and exactly one of them holds it at any time.
//!
//! ## Invariants
//!
//! - The buffer is never deallocated; retired chunks go back to the cache
//! - Block `i` starts at `i * block_size` and lies fully inside the buffer
//! - The registry link is stored unaligned at `blocks_bytes()`

use core::ptr::{self, NonNull};
use std::alloc;

use crate::core::ChunkLayout;
use crate::error::{MemoryError, MemoryResult};

/// Address of one chunk buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawChunk(NonNull<u8>);

// SAFETY: RawChunk is an owned heap address with no thread affinity.
// - The buffer comes from the process heap, which is thread-safe
// - It is only dereferenced by the single owner described in the module docs
// - The global cache hands it out under its shard lock
unsafe impl Send for RawChunk {}

// SAFETY: Sharing &RawChunk only exposes the address value itself.
unsafe impl Sync for RawChunk {}

impl RawChunk {
    /// Requests a fresh zero-filled chunk from the process heap
    pub(crate) fn allocate_zeroed(layout: &ChunkLayout) -> MemoryResult<Self> {
        let heap = layout.heap_layout()?;

        // SAFETY: heap layout always has non-zero size (it includes the link).
        let ptr = unsafe { alloc::alloc_zeroed(heap) };

        NonNull::new(ptr)
            .map(Self)
            .ok_or_else(|| MemoryError::allocation_failed_with_layout(heap))
    }

    /// Start of the buffer
    #[inline]
    pub(crate) fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }

    /// Address of block `index`
    #[inline]
    pub(crate) fn block(self, layout: &ChunkLayout, index: usize) -> NonNull<u8> {
        debug_assert!(index < layout.blocks_per_chunk());

        // SAFETY: index < blocks_per_chunk, so the offset stays inside the buffer
        // and the result is non-null.
        unsafe { NonNull::new_unchecked(self.as_ptr().add(index * layout.block_size())) }
    }

    /// Reads the registry link to the previously registered chunk.
    ///
    /// # Safety
    ///
    /// `self` must be a live chunk of `layout` whose link was written with
    /// [`set_next`](Self::set_next).
    #[inline]
    pub(crate) unsafe fn next(self, layout: &ChunkLayout) -> Option<Self> {
        // SAFETY: the link lies inside the buffer (caller contract), read unaligned
        // because blocks_bytes() is only a multiple of the block size.
        let link = unsafe {
            self.as_ptr()
                .add(layout.blocks_bytes())
                .cast::<*mut u8>()
                .read_unaligned()
        };
        NonNull::new(link).map(Self)
    }

    /// Writes the registry link.
    ///
    /// # Safety
    ///
    /// `self` must be a live chunk of `layout` owned by the caller.
    #[inline]
    pub(crate) unsafe fn set_next(self, layout: &ChunkLayout, next: Option<Self>) {
        let link = next.map_or(ptr::null_mut(), Self::as_ptr);

        // SAFETY: the link lies inside the buffer (caller contract).
        unsafe {
            self.as_ptr()
                .add(layout.blocks_bytes())
                .cast::<*mut u8>()
                .write_unaligned(link);
        }
    }

    /// Whether `ptr` is the start of one of this chunk's blocks
    pub(crate) fn contains_block(self, layout: &ChunkLayout, ptr: *const u8) -> bool {
        let base = self.as_ptr().addr();
        let addr = ptr.addr();

        addr >= base
            && addr - base < layout.blocks_bytes()
            && (addr - base) % layout.block_size() == 0
    }
}
