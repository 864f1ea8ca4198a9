//! Pool allocator statistics

use core::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of pool activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Pooled (<= 128 byte) allocations served
    pub allocations: u64,
    /// Pooled blocks returned to a free list
    pub deallocations: u64,
    /// Reallocation requests
    pub reallocations: u64,
    /// Requests forwarded straight to the raw allocator
    pub large_allocations: u64,
    /// Free-list misses that went to the arena
    pub refills: u64,
    /// Successful arena growths from the system heap
    pub arena_growths: u64,
    /// Larger free blocks turned into arena space
    pub scavenges: u64,
    /// Chunks obtained through the raw allocator's OOM protocol
    pub raw_fallbacks: u64,
    /// Arena remainders pushed onto a free list
    pub leftover_donations: u64,
    /// Bytes ever fetched from the system heap for the arena
    pub growth_counter: usize,
    /// Bytes left in the current arena
    pub arena_remaining: usize,
    /// Blocks parked on all free lists
    pub free_blocks: usize,
    /// Bytes parked on all free lists
    pub free_bytes: usize,
}

impl PoolStats {
    /// Pooled blocks currently held by callers
    #[must_use]
    pub fn live_blocks(&self) -> u64 {
        self.allocations.saturating_sub(self.deallocations)
    }

    /// Fraction of pooled allocations served without a refill
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn free_list_hit_rate(&self) -> f64 {
        if self.allocations == 0 {
            return 0.0;
        }
        self.allocations.saturating_sub(self.refills) as f64 / self.allocations as f64
    }
}

/// Live counters behind [`PoolStats`]
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub(crate) allocations: AtomicU64,
    pub(crate) deallocations: AtomicU64,
    pub(crate) reallocations: AtomicU64,
    pub(crate) large_allocations: AtomicU64,
    pub(crate) refills: AtomicU64,
    pub(crate) arena_growths: AtomicU64,
    pub(crate) scavenges: AtomicU64,
    pub(crate) raw_fallbacks: AtomicU64,
    pub(crate) leftover_donations: AtomicU64,
}

impl PoolCounters {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the event counters into a fresh snapshot
    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            deallocations: self.deallocations.load(Ordering::Relaxed),
            reallocations: self.reallocations.load(Ordering::Relaxed),
            large_allocations: self.large_allocations.load(Ordering::Relaxed),
            refills: self.refills.load(Ordering::Relaxed),
            arena_growths: self.arena_growths.load(Ordering::Relaxed),
            scavenges: self.scavenges.load(Ordering::Relaxed),
            raw_fallbacks: self.raw_fallbacks.load(Ordering::Relaxed),
            leftover_donations: self.leftover_donations.load(Ordering::Relaxed),
            ..PoolStats::default()
        }
    }
}
