//! Process-wide cache of retired chunks
//!
//! Chunks are never handed back to the heap. When the last handle of a pool is
//! dropped, its chunks are pushed here and the next pool with the same
//! [`ChunkLayout`] pops them instead of calling the heap again.
//!
//! The registry is created on first use and lives until the process exits.
//!
//! Slots are keyed by [`ChunkLayout`] (block size, blocks per chunk, buffer
//! alignment), not by allocator type. Instantiations whose `ALIGN` differs but
//! whose layouts come out equal, such as `<u64, N, 8>` and `<u64, N, 4>`, share
//! one slot and one set of counters.

use std::io;
use std::sync::LazyLock;

use core::fmt;
use dashmap::DashMap;

#[cfg(feature = "logging")]
use tracing::trace;

use super::raw::RawChunk;
use crate::core::ChunkLayout;
use crate::error::MemoryResult;

static GLOBAL_CHUNK_CACHE: LazyLock<DashMap<ChunkLayout, CacheSlot>> =
    LazyLock::new(DashMap::new);

/// Per-layout cache state
#[derive(Debug, Default)]
struct CacheSlot {
    /// Retired chunks, most recently retired on top
    chunks: Vec<RawChunk>,
    /// Chunks ever requested from the heap for this layout
    created: usize,
}

/// Chunk counters for one layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkCacheStats {
    /// Chunks ever allocated from the process heap
    pub created: usize,
    /// Chunks currently sitting in the cache
    pub cached: usize,
}

impl ChunkCacheStats {
    /// Chunks currently registered by live pools
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.created - self.cached
    }
}

impl fmt::Display for ChunkCacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chunks created: {}, cached: {}",
            self.created, self.cached
        )
    }
}

/// Entry point to the process-wide chunk cache
pub struct GlobalChunkCache;

impl GlobalChunkCache {
    /// Takes a chunk for `layout`, reusing a retired one when available.
    ///
    /// Reused chunks keep whatever bytes they held when retired; only chunks
    /// fresh from the heap are zero-filled.
    pub(crate) fn acquire(layout: &ChunkLayout) -> MemoryResult<RawChunk> {
        let mut slot = GLOBAL_CHUNK_CACHE.entry(*layout).or_default();

        if let Some(chunk) = slot.chunks.pop() {
            #[cfg(feature = "logging")]
            trace!(%layout, cached = slot.chunks.len(), "reusing cached chunk");
            return Ok(chunk);
        }

        let chunk = RawChunk::allocate_zeroed(layout)?;
        slot.created += 1;

        #[cfg(feature = "logging")]
        trace!(%layout, created = slot.created, "allocated chunk from heap");

        Ok(chunk)
    }

    /// Returns a chunk to the cache.
    ///
    /// The caller gives up ownership: the chunk must not be registered by any
    /// pool afterwards.
    pub(crate) fn retire(layout: &ChunkLayout, chunk: RawChunk) {
        let mut slot = GLOBAL_CHUNK_CACHE.entry(*layout).or_default();
        slot.chunks.push(chunk);

        debug_assert!(
            slot.chunks.len() <= slot.created,
            "more chunks cached than ever created for {layout}"
        );

        #[cfg(feature = "logging")]
        trace!(%layout, cached = slot.chunks.len(), "retired chunk");
    }

    /// Counters for `layout`; all zero if no pool with this layout ever grew
    pub fn stats(layout: &ChunkLayout) -> ChunkCacheStats {
        GLOBAL_CHUNK_CACHE
            .get(layout)
            .map(|slot| ChunkCacheStats {
                created: slot.created,
                cached: slot.chunks.len(),
            })
            .unwrap_or_default()
    }

    /// Writes the counters for `layout` to `sink`.
    ///
    /// Totals are per layout, merged across every pool type that maps to it.
    pub fn dump<W: io::Write + ?Sized>(layout: &ChunkLayout, sink: &mut W) -> io::Result<()> {
        writeln!(sink, "{layout}: {}", Self::stats(layout))
    }
}
