//! Pool allocator configuration

use super::size_class::DEFAULT_CHUNKS;
use crate::error::{MemoryError, MemoryResult};

/// Largest accepted [`PoolConfig::refill_batch`]
pub const MAX_REFILL_BATCH: usize = 4096;

/// Configuration for pool allocator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Blocks requested from the arena when a free list runs dry
    pub refill_batch: usize,

    /// Enable statistics tracking
    pub track_stats: bool,

    /// Fill pattern byte for deallocated memory (for debugging)
    pub dealloc_pattern: Option<u8>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            refill_batch: DEFAULT_CHUNKS,
            track_stats: cfg!(debug_assertions),
            dealloc_pattern: if cfg!(debug_assertions) {
                Some(0xDD)
            } else {
                None
            },
        }
    }
}

impl PoolConfig {
    /// Production configuration - optimized for performance
    #[must_use]
    pub fn production() -> Self {
        Self {
            refill_batch: DEFAULT_CHUNKS,
            track_stats: false,
            dealloc_pattern: None,
        }
    }

    /// Debug configuration - optimized for debugging
    #[must_use]
    pub fn debug() -> Self {
        Self {
            refill_batch: DEFAULT_CHUNKS,
            track_stats: true,
            dealloc_pattern: Some(0xDD),
        }
    }

    /// Performance configuration - larger refills, minimal overhead
    #[must_use]
    pub fn performance() -> Self {
        Self {
            refill_batch: DEFAULT_CHUNKS * 4,
            track_stats: false,
            dealloc_pattern: None,
        }
    }

    /// Sets the refill batch size
    #[must_use]
    pub fn with_refill_batch(mut self, refill_batch: usize) -> Self {
        self.refill_batch = refill_batch;
        self
    }

    /// Enables or disables statistics
    #[must_use]
    pub fn with_stats(mut self, track_stats: bool) -> Self {
        self.track_stats = track_stats;
        self
    }

    /// Checks the configuration before a pool is built from it
    ///
    /// # Errors
    /// `InvalidConfig` when `refill_batch` is outside `1..=MAX_REFILL_BATCH`.
    pub fn validate(&self) -> MemoryResult<()> {
        if self.refill_batch == 0 {
            return Err(MemoryError::invalid_pool_config("refill_batch must be at least 1"));
        }
        if self.refill_batch > MAX_REFILL_BATCH {
            return Err(MemoryError::invalid_pool_config("refill_batch exceeds 4096"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for config in [
            PoolConfig::default(),
            PoolConfig::production(),
            PoolConfig::debug(),
            PoolConfig::performance(),
        ] {
            assert!(config.validate().is_ok(), "{config:?}");
        }
    }

    #[test]
    fn test_default_batch() {
        assert_eq!(PoolConfig::default().refill_batch, DEFAULT_CHUNKS);
        assert!(PoolConfig::debug().track_stats);
        assert!(!PoolConfig::production().track_stats);
    }

    #[test]
    fn test_batch_bounds() {
        let err = PoolConfig::default().with_refill_batch(0).validate().unwrap_err();
        assert_eq!(err.code(), "MEM:CONFIG:INVALID");

        assert!(
            PoolConfig::default()
                .with_refill_batch(MAX_REFILL_BATCH + 1)
                .validate()
                .is_err()
        );
        assert!(
            PoolConfig::default()
                .with_refill_batch(MAX_REFILL_BATCH)
                .validate()
                .is_ok()
        );
    }
}
