//! Fixed-block allocator handle
//!
//! # Safety
//!
//! [`FixedBlockAllocator`] hands out raw, uninitialized blocks. Construction and
//! destruction of values in those blocks is decoupled from allocation and left
//! to the caller, exactly like a container driving an allocator:
//!
//! ```text
//! allocate(1) -> construct(p, v) -> ... -> destroy(p) -> deallocate(p, 1)
//! ```
//!
//! ## Safety Contracts
//!
//! - `deallocate`: pointer and count must match an earlier `allocate` on a
//!   handle sharing the same pool, and the pool must not have been released since
//! - `construct`/`destroy`: pointer must be a live block (or bulk buffer) of
//!   this allocator, holding no value / a value respectively
//! - `release`: no block of the pool may be used afterwards
//!
//! Handles are `!Send` and `!Sync`: the pool state is shared through `Rc` and
//! mutated through `RefCell`.

use core::fmt;
use core::marker::PhantomData;
use core::mem::{align_of, size_of};
use core::ptr::{self, NonNull};
use std::alloc::{self, Layout};
use std::io;
use std::rc::Rc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use super::group::PoolGroup;
use super::{PoolConfig, PoolStats};
use crate::chunk::{ChunkCacheStats, GlobalChunkCache};
use crate::core::{ChunkLayout, DEFAULT_ALIGNMENT, DEFAULT_BLOCKS_PER_CHUNK, block_size_for};
use crate::error::{MemoryError, MemoryResult};

/// Pool allocator for values of one type
///
/// Single values are carved out of chunks of `N` blocks. Each block is
/// `size_of::<T>()` rounded up to a multiple of `ALIGN`. Requests for more than
/// one value bypass the pool and go straight to the process heap.
///
/// Cloning a handle, or rebinding it to another element type with the same
/// block size, shares the pool: blocks allocated through one handle may be
/// deallocated through any other. The pool's chunks are retired to the global
/// chunk cache when the last sharing handle is dropped.
///
/// # Example
/// ```
/// use nebula_fbpool::pool::FixedBlockAllocator;
///
/// let alloc = FixedBlockAllocator::<u64, 4>::new();
/// let block = alloc.allocate(1)?;
///
/// // SAFETY: block is a fresh block of this allocator.
/// unsafe {
///     alloc.construct(block, 42);
///     assert_eq!(*block.as_ref(), 42);
///     alloc.destroy(block);
///     alloc.deallocate(block, 1);
/// }
/// assert_eq!(alloc.allocation_count(), 0);
/// # Ok::<(), nebula_fbpool::MemoryError>(())
/// ```
pub struct FixedBlockAllocator<
    T,
    const N: usize = DEFAULT_BLOCKS_PER_CHUNK,
    const ALIGN: usize = DEFAULT_ALIGNMENT,
> {
    group: Rc<PoolGroup>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, const N: usize, const ALIGN: usize> FixedBlockAllocator<T, N, ALIGN> {
    /// Size of one block: `size_of::<T>()` rounded up to a multiple of `ALIGN`
    pub const BLOCK_SIZE: usize = block_size_for(size_of::<T>(), ALIGN);

    const LAYOUT: ChunkLayout = ChunkLayout::for_element::<T>(N, ALIGN);

    /// Rejects configurations that cannot be pooled, at compile time
    const CHECKED: () = {
        assert!(N > 0, "blocks per chunk must be non-zero");
        assert!(ALIGN > 0, "block alignment must be non-zero");
        assert!(size_of::<T>() > 0, "zero-sized element types are not pooled");
        assert!(
            Self::BLOCK_SIZE % align_of::<T>() == 0,
            "block size must be a multiple of the element alignment"
        );
    };

    /// Creates a handle to a new, empty pool with the default configuration
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Creates a handle to a new, empty pool
    ///
    /// No chunk is allocated until the first single-value allocation.
    pub fn with_config(config: PoolConfig) -> Self {
        let () = Self::CHECKED;

        #[cfg(feature = "logging")]
        trace!(layout = %Self::LAYOUT, ?config, "created pool");

        Self::attach(Rc::new(PoolGroup::new(Self::LAYOUT, config)))
    }

    fn attach(group: Rc<PoolGroup>) -> Self {
        Self {
            group,
            _marker: PhantomData,
        }
    }

    /// Returns a handle for another element type.
    ///
    /// The new handle shares this pool when its block size is the same and the
    /// pool's chunks are aligned for `U`; otherwise it gets a new pool with the
    /// same configuration.
    pub fn rebind<U>(&self) -> FixedBlockAllocator<U, N, ALIGN> {
        let () = FixedBlockAllocator::<U, N, ALIGN>::CHECKED;

        let layout = self.group.layout();
        let compatible = FixedBlockAllocator::<U, N, ALIGN>::BLOCK_SIZE == layout.block_size()
            && align_of::<U>() <= layout.align();

        if compatible {
            FixedBlockAllocator::attach(Rc::clone(&self.group))
        } else {
            FixedBlockAllocator::with_config(*self.group.config())
        }
    }

    /// Allocates storage for `n` values of `T`.
    ///
    /// `n == 1` takes a block from the pool, growing it by one chunk when the
    /// free list is empty. `n == 0` returns a dangling pointer. Anything larger
    /// is an unpooled request to the process heap.
    ///
    /// The storage is uninitialized.
    pub fn allocate(&self, n: usize) -> MemoryResult<NonNull<T>> {
        match n {
            1 => self.group.allocate_block().map(NonNull::cast),
            0 => Ok(NonNull::dangling()),
            _ => {
                let layout = Layout::array::<T>(n)
                    .map_err(|_| MemoryError::size_overflow("bulk allocation"))?;

                // SAFETY: layout has non-zero size, n > 1 and T is not zero-sized.
                let ptr = unsafe { alloc::alloc(layout) };

                NonNull::new(ptr.cast::<T>())
                    .ok_or_else(|| MemoryError::allocation_failed_with_layout(layout))
            }
        }
    }

    /// Returns storage for `n` values obtained from [`allocate`](Self::allocate).
    ///
    /// Values still living in the storage are not dropped.
    ///
    /// # Safety
    ///
    /// - `ptr` was returned by `allocate(n)` with the same `n` on a handle
    ///   sharing this pool, and the pool was not released since
    /// - `ptr` has not been deallocated already and is not used afterwards
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        match n {
            // SAFETY: single values come from the pool (caller contract).
            1 => unsafe { self.group.deallocate_block(ptr.cast()) },
            0 => {}
            _ => {
                // SAFETY: Layout::array::<T>(n) accepted this size and alignment when
                // the buffer was allocated (caller contract).
                let layout =
                    unsafe { Layout::from_size_align_unchecked(size_of::<T>() * n, align_of::<T>()) };

                // SAFETY: the buffer came from alloc::alloc with this layout.
                unsafe { alloc::dealloc(ptr.as_ptr().cast(), layout) };
            }
        }
    }

    /// Moves `value` into the storage at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be live storage from this allocator that holds no value.
    #[inline]
    pub unsafe fn construct(&self, ptr: NonNull<T>, value: T) {
        // SAFETY: ptr is valid, aligned, uninitialized storage (caller contract).
        unsafe { ptr.write(value) }
    }

    /// Writes `T::default()` into the storage at `ptr`.
    ///
    /// # Safety
    ///
    /// Same as [`construct`](Self::construct).
    #[inline]
    pub unsafe fn construct_default(&self, ptr: NonNull<T>)
    where
        T: Default,
    {
        // SAFETY: forwarded caller contract.
        unsafe { self.construct(ptr, T::default()) }
    }

    /// Drops the value at `ptr` in place, leaving the storage allocated.
    ///
    /// # Safety
    ///
    /// `ptr` must hold a live value constructed in storage from this allocator;
    /// the value must not be used afterwards.
    #[inline]
    pub unsafe fn destroy(&self, ptr: NonNull<T>) {
        // SAFETY: ptr holds an initialized T (caller contract).
        unsafe { ptr::drop_in_place(ptr.as_ptr()) }
    }

    /// Address of `value`
    #[inline]
    pub fn address(&self, value: &T) -> NonNull<T> {
        NonNull::from(value)
    }

    /// Per-block size in bytes.
    ///
    /// Kept for allocator-interface parity; it is not a bound on how many
    /// values can be allocated.
    #[inline]
    pub const fn max_size(&self) -> usize {
        Self::BLOCK_SIZE
    }

    /// Releases every chunk of the pool to the global cache, keeping the
    /// handle usable.
    ///
    /// Only allowed while this is the sole handle of the pool; otherwise the
    /// pool is left untouched and an error is returned. The allocation counter
    /// is reset to zero. Values in outstanding blocks are not dropped.
    ///
    /// # Safety
    ///
    /// No block allocated from this pool may be used (read, written, destroyed
    /// or deallocated) after a successful release.
    pub unsafe fn release(&self) -> MemoryResult<()> {
        let refcount = self.refcount();
        if refcount > 1 {
            return Err(MemoryError::pool_still_shared(refcount));
        }

        let _retired = self.group.drain();

        #[cfg(feature = "logging")]
        debug!(layout = %self.group.layout(), retired = _retired, "released pool");

        Ok(())
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Blocks carved out of each chunk
    #[doc(alias = "nof_elmts")]
    #[inline]
    pub const fn blocks_per_chunk(&self) -> usize {
        N
    }

    /// Size of one block
    #[doc(alias = "elsize")]
    #[inline]
    pub const fn block_size(&self) -> usize {
        Self::BLOCK_SIZE
    }

    /// Configured block alignment
    #[doc(alias = "alignmnt")]
    #[inline]
    pub const fn alignment(&self) -> usize {
        ALIGN
    }

    /// Bytes requested from the heap per chunk: all blocks plus the registry link
    #[doc(alias = "chunksize")]
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.group.layout().chunk_size()
    }

    /// Number of handles sharing this pool.
    ///
    /// Every live [`PoolBox`](super::PoolBox) holds a handle of its own, so
    /// boxes count here too and keep [`release`](Self::release) refused.
    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.group)
    }

    /// Blocks handed out and not yet returned, across all sharing handles
    #[doc(alias = "nof_allocs")]
    pub fn allocation_count(&self) -> usize {
        self.group.outstanding()
    }

    /// Whether `ptr` is the start of a block of this pool
    pub fn owns(&self, ptr: *const T) -> bool {
        self.group.owns(ptr.cast())
    }

    /// Whether both handles use the same pool
    pub fn shares_pool_with<U>(&self, other: &FixedBlockAllocator<U, N, ALIGN>) -> bool {
        Rc::ptr_eq(&self.group, &other.group)
    }

    /// Chunk layout of the pool, the key of its global cache slot
    pub fn chunk_layout(&self) -> ChunkLayout {
        *self.group.layout()
    }

    /// Configuration of the pool
    pub fn config(&self) -> PoolConfig {
        *self.group.config()
    }

    /// Snapshot of the pool's counters
    pub fn stats(&self) -> PoolStats {
        let layout = self.group.layout();
        PoolStats {
            block_size: layout.block_size(),
            blocks_per_chunk: layout.blocks_per_chunk(),
            chunks: self.group.chunk_count(),
            free_blocks: self.group.free_blocks(),
            outstanding: self.group.outstanding(),
            refcount: self.refcount(),
        }
    }

    /// Global chunk cache counters for this pool's chunk layout
    pub fn cache_stats(&self) -> ChunkCacheStats {
        GlobalChunkCache::stats(self.group.layout())
    }

    /// Writes the global chunk cache counters for this pool's layout to `sink`.
    ///
    /// The totals cover every pool with an equal [`ChunkLayout`], not only this
    /// instantiation: `<u64, N, 8>` and `<u64, N, 4>` have the same layout and
    /// report combined counters.
    pub fn dump<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        GlobalChunkCache::dump(self.group.layout(), sink)
    }
}

impl<T, const N: usize, const ALIGN: usize> Default for FixedBlockAllocator<T, N, ALIGN> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning shares the pool
impl<T, const N: usize, const ALIGN: usize> Clone for FixedBlockAllocator<T, N, ALIGN> {
    fn clone(&self) -> Self {
        Self::attach(Rc::clone(&self.group))
    }
}

/// Handles compare equal when they share a pool, so memory from one can be
/// returned through the other
impl<T, U, const N: usize, const ALIGN: usize> PartialEq<FixedBlockAllocator<U, N, ALIGN>>
    for FixedBlockAllocator<T, N, ALIGN>
{
    fn eq(&self, other: &FixedBlockAllocator<U, N, ALIGN>) -> bool {
        self.shares_pool_with(other)
    }
}

impl<T, const N: usize, const ALIGN: usize> Eq for FixedBlockAllocator<T, N, ALIGN> {}

impl<T, const N: usize, const ALIGN: usize> fmt::Debug for FixedBlockAllocator<T, N, ALIGN> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedBlockAllocator")
            .field("element", &core::any::type_name::<T>())
            .field("block_size", &Self::BLOCK_SIZE)
            .field("blocks_per_chunk", &N)
            .field("alignment", &ALIGN)
            .field("refcount", &self.refcount())
            .field("allocations", &self.allocation_count())
            .finish()
    }
}
