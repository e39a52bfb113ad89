//! Common types and constants for pool configuration

/// Default number of blocks carved out of one chunk
pub const DEFAULT_BLOCKS_PER_CHUNK: usize = 100;

/// Default block alignment (the size of a pointer)
pub const DEFAULT_ALIGNMENT: usize = core::mem::size_of::<*const u8>();

/// Size of the trailing registry link stored after the blocks of every chunk
pub const CHUNK_LINK_SIZE: usize = core::mem::size_of::<*mut u8>();

