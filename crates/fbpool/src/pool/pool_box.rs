//! Smart pointer for pool-allocated values

use core::fmt;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use super::FixedBlockAllocator;
use crate::core::{DEFAULT_ALIGNMENT, DEFAULT_BLOCKS_PER_CHUNK};
use crate::error::MemoryResult;

/// Owning pointer to a value living in a pool block
///
/// Holds a handle of the pool, so the pool outlives the box and cannot be
/// released while the box exists. Dropping the box drops the value and returns
/// the block to the pool.
pub struct PoolBox<
    T,
    const N: usize = DEFAULT_BLOCKS_PER_CHUNK,
    const ALIGN: usize = DEFAULT_ALIGNMENT,
> {
    ptr: NonNull<T>,
    alloc: FixedBlockAllocator<T, N, ALIGN>,
}

impl<T, const N: usize, const ALIGN: usize> PoolBox<T, N, ALIGN> {
    /// Moves `value` into a block taken from `alloc`'s pool.
    ///
    /// On allocation failure `value` is dropped and the error returned.
    #[must_use = "allocated value must be used"]
    pub fn new_in(value: T, alloc: &FixedBlockAllocator<T, N, ALIGN>) -> MemoryResult<Self> {
        let ptr = alloc.allocate(1)?;

        // SAFETY: ptr is a fresh block of alloc holding no value.
        unsafe { alloc.construct(ptr, value) };

        Ok(Self {
            ptr,
            alloc: alloc.clone(),
        })
    }

    /// Handle of the pool the value lives in
    pub fn allocator(&self) -> &FixedBlockAllocator<T, N, ALIGN> {
        &self.alloc
    }

    /// Address of the block holding the value
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Moves the value out and returns the block to the pool
    #[must_use]
    pub fn into_inner(self) -> T {
        let this = ManuallyDrop::new(self);

        // SAFETY: the block holds an initialized T that is moved out exactly once;
        // ManuallyDrop keeps Drop from touching it again.
        let value = unsafe { this.ptr.read() };

        // SAFETY: the block came from allocate(1) on this pool and is now empty.
        unsafe { this.alloc.deallocate(this.ptr, 1) };

        // SAFETY: the handle is taken out once and the box is never used again.
        drop(unsafe { ptr::read(&this.alloc) });

        value
    }
}

impl<T, const N: usize, const ALIGN: usize> Deref for PoolBox<T, N, ALIGN> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: ptr holds an initialized T owned by this box.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, const N: usize, const ALIGN: usize> DerefMut for PoolBox<T, N, ALIGN> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: ptr holds an initialized T and &mut self makes access exclusive.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T, const N: usize, const ALIGN: usize> AsRef<T> for PoolBox<T, N, ALIGN> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T, const N: usize, const ALIGN: usize> AsMut<T> for PoolBox<T, N, ALIGN> {
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

impl<T: fmt::Debug, const N: usize, const ALIGN: usize> fmt::Debug for PoolBox<T, N, ALIGN> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T, const N: usize, const ALIGN: usize> Drop for PoolBox<T, N, ALIGN> {
    fn drop(&mut self) {
        // SAFETY: ptr holds the value constructed in new_in, in a block of this
        // pool; neither is used after this point.
        unsafe {
            self.alloc.destroy(self.ptr);
            self.alloc.deallocate(self.ptr, 1);
        }
    }
}
