//! Block size computation and chunk geometry
//!
//! A chunk is one heap buffer holding `blocks_per_chunk` equally sized blocks
//! followed by a pointer-sized link to the previously registered chunk:
//!
//! ```text
//! [Block0][Block1]...[BlockN-1][link]
//!  ^ block_size apart          ^ blocks_bytes()
//! ```

use core::alloc::Layout;
use core::fmt;

use super::types::CHUNK_LINK_SIZE;
use crate::error::{MemoryError, MemoryResult};

/// Returns the smallest block size `>= size` that is a multiple of `alignment`.
///
/// `alignment` does not have to be a power of two. The search walks upward one
/// byte at a time, so it is meant for construction time, not hot paths.
///
/// # Examples
///
/// ```
/// use nebula_fbpool::core::block_size_for;
///
/// assert_eq!(block_size_for(12, 8), 16);
/// assert_eq!(block_size_for(16, 8), 16);
/// assert_eq!(block_size_for(5, 3), 6);
/// ```
///
/// # Panics
///
/// Panics if `alignment` is zero.
pub const fn block_size_for(size: usize, alignment: usize) -> usize {
    assert!(alignment > 0, "block alignment must be non-zero");

    let mut block = size;
    while block % alignment != 0 {
        block += 1;
    }
    block
}

/// Geometry of the chunks backing one pool configuration.
///
/// Also the key of the process-wide chunk cache: pools whose layouts compare
/// equal recycle each other's chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkLayout {
    block_size: usize,
    blocks_per_chunk: usize,
    align: usize,
}

impl ChunkLayout {
    /// Chunk layout for elements of type `T`.
    ///
    /// The buffer alignment is the larger of `T`'s alignment and a pointer's, so
    /// every block is aligned for `T` as long as `block_size` is a multiple of it.
    pub const fn for_element<T>(blocks_per_chunk: usize, alignment: usize) -> Self {
        let elem_align = core::mem::align_of::<T>();
        let link_align = core::mem::align_of::<*mut u8>();
        Self {
            block_size: block_size_for(core::mem::size_of::<T>(), alignment),
            blocks_per_chunk,
            align: if elem_align > link_align {
                elem_align
            } else {
                link_align
            },
        }
    }

    /// Size of one block in bytes
    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks per chunk
    #[inline]
    pub const fn blocks_per_chunk(&self) -> usize {
        self.blocks_per_chunk
    }

    /// Alignment of the chunk buffer
    #[inline]
    pub const fn align(&self) -> usize {
        self.align
    }

    /// Bytes occupied by the blocks, which is also the offset of the trailing link
    #[inline]
    pub const fn blocks_bytes(&self) -> usize {
        self.block_size * self.blocks_per_chunk
    }

    /// Total chunk size: all blocks plus the trailing link
    #[inline]
    pub const fn chunk_size(&self) -> usize {
        self.blocks_bytes() + CHUNK_LINK_SIZE
    }

    /// Heap layout used to request a chunk from the process heap
    pub fn heap_layout(&self) -> MemoryResult<Layout> {
        let size = self
            .block_size
            .checked_mul(self.blocks_per_chunk)
            .and_then(|bytes| bytes.checked_add(CHUNK_LINK_SIZE))
            .ok_or_else(|| MemoryError::size_overflow("chunk size calculation"))?;

        Layout::from_size_align(size, self.align)
            .map_err(|_| MemoryError::invalid_layout("chunk exceeds isize::MAX"))
    }
}

impl fmt::Display for ChunkLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {}B blocks ({}B chunk, align {})",
            self.blocks_per_chunk,
            self.block_size,
            self.chunk_size(),
            self.align
        )
    }
}
