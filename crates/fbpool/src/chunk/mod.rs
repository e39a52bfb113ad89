//! Chunk management
//!
//! Chunks are acquired from the process-wide cache or, when it is empty for the
//! requested layout, freshly from the process heap. Retired chunks go back to
//! the cache and are never released to the operating system.
//!
//! ## Modules
//! - `raw` - Chunk buffers and their trailing registry link
//! - `cache` - Process-wide registry of retired chunks, keyed by layout

pub mod cache;
pub(crate) mod raw;

pub use cache::{ChunkCacheStats, GlobalChunkCache};
pub(crate) use raw::RawChunk;
