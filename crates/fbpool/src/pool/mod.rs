//! Fixed-size block pools
//!
//! A pool hands out blocks of one size, carved out of chunks of `N` blocks each.
//! All handles created by cloning or compatible rebinding share one pool; the
//! pool's chunks go back to the global chunk cache when the last of them is
//! dropped.
//!
//! ## Modules
//! - `allocator` - [`FixedBlockAllocator`] handle, the public entry point
//! - `group` - Free list, chunk registry and counters shared by handles
//! - `config` - Runtime debugging knobs
//! - `stats` - Pool statistics snapshot
//! - `pool_box` - Owning smart pointer into a pool

pub mod allocator;
pub mod config;
pub(crate) mod group;
pub mod pool_box;
pub mod stats;

pub use allocator::FixedBlockAllocator;
pub use config::PoolConfig;
pub use pool_box::PoolBox;
pub use stats::PoolStats;
