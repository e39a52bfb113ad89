//! # nebula-fbpool
//!
//! Fixed-size block pool allocator for workloads that allocate and free many
//! values of one type.
//!
//! Single-value requests are served from pools of equally sized blocks carved
//! out of larger chunks. Chunks of a dropped pool are not returned to the
//! operating system: they go to a process-wide cache, keyed by chunk layout,
//! and are reused by the next pool that needs one.
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_fbpool::prelude::*;
//!
//! let alloc = FixedBlockAllocator::<[u8; 12], 4>::new();
//! assert_eq!(alloc.block_size(), 16);
//!
//! // Handles with the same block size share one pool
//! let other = alloc.rebind::<[u32; 4]>();
//! assert_eq!(alloc.refcount(), 2);
//!
//! let value = PoolBox::new_in([7; 4], &other)?;
//! assert!(other.owns(value.as_ptr()));
//! assert_eq!(alloc.allocation_count(), 1);
//! # Ok::<(), MemoryError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured `tracing` events for chunk growth,
//!   retirement and pool release
//!
//! ## Architecture
//!
//! - [`core`] - Block size calculation and chunk layout descriptors
//! - [`chunk`] - Chunk buffers and the global chunk cache
//! - [`pool`] - Shared pools, the allocator handle and `PoolBox`
//! - [`error`] - Error type shared by all fallible operations

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rust_2018_idioms)]
// Raw chunk buffers and block hand-out are inherently unsafe
#![allow(unsafe_code)]

pub mod chunk;
pub mod core;
pub mod error;
pub mod pool;

pub use crate::chunk::{ChunkCacheStats, GlobalChunkCache};
pub use crate::core::{ChunkLayout, block_size_for};
pub use crate::error::{MemoryError, MemoryResult, Result};
pub use crate::pool::{FixedBlockAllocator, PoolBox, PoolConfig, PoolStats};

pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::chunk::{ChunkCacheStats, GlobalChunkCache};
    pub use crate::core::{ChunkLayout, block_size_for};
    pub use crate::error::{MemoryError, MemoryResult};
    pub use crate::pool::{FixedBlockAllocator, PoolBox, PoolConfig, PoolStats};
}
