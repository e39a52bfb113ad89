//! Core building blocks shared by the chunk manager and the pools
//!
//! - Block size computation and chunk geometry
//! - Configuration defaults and constants

pub mod layout;
pub mod types;

pub use layout::{ChunkLayout, block_size_for};
pub use types::*;
