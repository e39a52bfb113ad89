//! Pool configuration
//!
//! Block geometry is fixed at compile time by the allocator's const
//! parameters. `PoolConfig` only carries the runtime debugging knobs, chosen
//! once when an independent pool is created and inherited by every handle that
//! shares it.

/// Configuration for a fixed-block pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Check on every single-block deallocation that the pointer is a block of
    /// this pool, panicking otherwise
    pub verify_ownership: bool,

    /// Fill pattern byte for newly allocated blocks (for debugging)
    pub alloc_pattern: Option<u8>,
    /// Fill pattern byte for deallocated blocks (for debugging)
    pub dealloc_pattern: Option<u8>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            verify_ownership: cfg!(debug_assertions),
            alloc_pattern: None,
            dealloc_pattern: if cfg!(debug_assertions) {
                Some(0xDD)
            } else {
                None
            },
        }
    }
}

impl PoolConfig {
    /// Production configuration - no checks, no fills
    #[must_use]
    pub fn production() -> Self {
        Self {
            verify_ownership: false,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Debug configuration - ownership checks and fill patterns on both paths
    #[must_use]
    pub fn debug() -> Self {
        Self {
            verify_ownership: true,
            alloc_pattern: Some(0xBB),
            dealloc_pattern: Some(0xDD),
        }
    }

    /// Performance configuration - keeps ownership checks, skips fills
    #[must_use]
    pub fn performance() -> Self {
        Self {
            verify_ownership: cfg!(debug_assertions),
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }
}
