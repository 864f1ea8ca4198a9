//! Segregated free-list allocator
//!
//! # Safety
//!
//! The pool owns three kinds of memory, all obtained through its embedded
//! [`RawAllocator`]:
//! - **segments**: arena regions fetched from the system heap, plus chunks
//!   obtained through the raw fallback; recorded so `Drop` can return them
//! - **arena**: the uncarved tail of the most recent segment (or of a
//!   scavenged block)
//! - **free blocks**: carved blocks parked on one of the 16 class lists
//!
//! ## Invariants
//!
//! - Every pooled block is aligned to `ALIGN` and sized to its class
//! - A block is on at most one free list, and never on a list while a
//!   caller holds it
//! - No `RefCell` borrow is held across a call into the system heap or the
//!   OOM handler. Handlers are `Send + Sync` and the pool is not `Sync`, so a
//!   handler can only re-enter a pool whose address the caller handed it
//! - Requests above `MAX_BYTES` never touch the pool state

use core::cell::RefCell;
use core::fmt;
use core::ptr::{self, NonNull};
use core::sync::atomic::AtomicU64;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

use super::arena::Arena;
use super::config::PoolConfig;
use super::free_list::FreeLists;
use super::size_class::{NUM_FREE_LISTS, is_class_size, is_pooled, round_up, size_class_index};
use super::stats::{PoolCounters, PoolStats};
use crate::allocator::{
    AllocError, AllocResult, ByteAllocator, OomHandler, RawAllocator, SystemAllocator, SystemHeap,
};
use crate::error::MemoryResult;

/// Upper bound on carve attempts in [`PoolAllocator::alloc_chunk`]
///
/// A successful growth or scavenge always leaves enough arena for at least
/// one block, so the second pass carves.
const MAX_CARVE_ATTEMPTS: usize = 3;

/// Contiguous run of equally sized blocks handed out by
/// [`PoolAllocator::alloc_chunk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// First block; the rest follow at `bytes` strides
    pub start: NonNull<u8>,
    /// Number of blocks, between 1 and the requested count
    pub blocks: usize,
}

/// Memory fetched from the system on the pool's behalf
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: NonNull<u8>,
    bytes: usize,
}

struct PoolState {
    free_lists: FreeLists,
    arena: Arena,
    segments: Vec<Segment>,
}

/// Two-tier allocator with 16 segregated free lists
///
/// Requests of 1..=128 bytes are rounded to a multiple of 8 and served from
/// the matching free list, which is refilled in batches carved from a bump
/// arena. Larger requests go straight to the embedded [`RawAllocator`].
///
/// # Memory Layout
/// ```text
/// segment: [blk][blk][blk][blk]......[ arena remainder ]
///                 ↑ carved                ↑ cursor     ↑ limit
/// class 1: [16] → [16] → [16] → None
/// class 4: [40] → None
/// ```
///
/// The pool is single-threaded: its state sits in a `RefCell`, so the type
/// is `Send` but not `Sync`. Use one pool per thread.
///
/// Dropping the pool returns every segment to the system heap. Pointers it
/// handed out must not outlive it.
///
/// # Examples
/// ```
/// use segalloc::allocator::PoolAllocator;
///
/// let pool = PoolAllocator::new();
/// let ptr = pool.allocate(24)?;
/// unsafe { pool.deallocate(ptr, 24) };
///
/// // LIFO reuse
/// assert_eq!(pool.allocate(24)?, ptr);
/// # Ok::<(), segalloc::MemoryError>(())
/// ```
pub struct PoolAllocator<H: SystemHeap = SystemAllocator> {
    raw: RawAllocator<H>,
    state: RefCell<PoolState>,
    config: PoolConfig,
    counters: PoolCounters,
}

impl PoolAllocator<SystemAllocator> {
    /// Creates a pool over the platform allocator with default configuration
    pub fn new() -> Self {
        Self::from_parts(RawAllocator::new(), PoolConfig::default())
    }

    /// Creates a pool over the platform allocator
    ///
    /// # Errors
    /// `InvalidConfig` if `config` fails validation.
    pub fn with_config(config: PoolConfig) -> MemoryResult<Self> {
        Self::with_heap(SystemAllocator::new(), config)
    }

    /// Production preset
    pub fn production() -> Self {
        Self::from_parts(RawAllocator::new(), PoolConfig::production())
    }

    /// Debug preset: statistics on, freed blocks filled with `0xDD`
    pub fn debug() -> Self {
        Self::from_parts(RawAllocator::new(), PoolConfig::debug())
    }
}

impl Default for PoolAllocator<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: SystemHeap> PoolAllocator<H> {
    /// Creates a pool whose segments and large blocks come from `heap`
    ///
    /// # Errors
    /// `InvalidConfig` if `config` fails validation.
    pub fn with_heap(heap: H, config: PoolConfig) -> MemoryResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(RawAllocator::with_heap(heap), config))
    }

    fn from_parts(raw: RawAllocator<H>, config: PoolConfig) -> Self {
        Self {
            raw,
            state: RefCell::new(PoolState {
                free_lists: FreeLists::new(),
                arena: Arena::new(),
                segments: Vec::new(),
            }),
            config,
            counters: PoolCounters::default(),
        }
    }

    /// The embedded raw allocator
    pub fn raw(&self) -> &RawAllocator<H> {
        &self.raw
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Installs an OOM handler on the embedded raw allocator
    pub fn set_oom_handler(&self, handler: Option<OomHandler>) -> Option<OomHandler> {
        self.raw.set_oom_handler(handler)
    }

    /// Allocates `bytes` bytes, aligned to 8
    ///
    /// The returned memory is uninitialized.
    ///
    /// # Errors
    /// - `InvalidRequest` for a zero-byte request
    /// - `OutOfMemory` if the system heap is exhausted and no OOM handler
    ///   could recover
    pub fn allocate(&self, bytes: usize) -> AllocResult<NonNull<u8>> {
        if bytes == 0 {
            return Err(AllocError::invalid_request("zero-byte pooled allocation"));
        }

        if !is_pooled(bytes) {
            let ptr = self.raw.allocate(bytes)?;
            self.record(|c| &c.large_allocations);
            return Ok(ptr);
        }

        let index = size_class_index(bytes);
        let popped = self.state.borrow_mut().free_lists.get_mut(index).pop();
        let block = match popped {
            Some(block) => block,
            None => self.refill(round_up(bytes))?,
        };

        self.record(|c| &c.allocations);
        Ok(block)
    }

    /// Returns a block to its free list, or to the system if it is large
    ///
    /// A zero-byte deallocation is a no-op.
    ///
    /// # Safety
    /// - `ptr` must have been returned by this pool
    /// - `bytes` must be the size it was allocated (or reallocated) with
    /// - `ptr` must not be used afterwards
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize) {
        if bytes == 0 {
            return;
        }

        if !is_pooled(bytes) {
            // SAFETY: large blocks come straight from the raw allocator.
            unsafe { self.raw.deallocate(ptr, bytes) };
            return;
        }

        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: the caller owned the whole class-sized block.
            unsafe { ptr.as_ptr().write_bytes(pattern, round_up(bytes)) };
        }

        let index = size_class_index(bytes);
        // SAFETY: caller contract; the block is class-sized and 8-aligned.
        unsafe { self.state.borrow_mut().free_lists.get_mut(index).push(ptr) };
        self.record(|c| &c.deallocations);
    }

    /// Resizes an allocation
    ///
    /// - both sizes above 128: resized by the system heap
    /// - same size class: `ptr` is returned unchanged
    /// - otherwise: allocate, copy `min(old_bytes, new_bytes)`, free the old block
    ///
    /// # Errors
    /// - `InvalidRequest` if either size is zero
    /// - `OutOfMemory` as for [`allocate`](Self::allocate); `ptr` stays valid
    ///
    /// # Safety
    /// Same requirements as [`deallocate`](Self::deallocate) for `ptr` and
    /// `old_bytes`.
    pub unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> AllocResult<NonNull<u8>> {
        if old_bytes == 0 || new_bytes == 0 {
            return Err(AllocError::invalid_request("zero-byte pooled reallocation"));
        }
        self.record(|c| &c.reallocations);

        if !is_pooled(old_bytes) && !is_pooled(new_bytes) {
            // SAFETY: both sizes are large, so `ptr` came from the raw allocator.
            return unsafe { self.raw.reallocate(ptr, old_bytes, new_bytes) };
        }
        if round_up(old_bytes) == round_up(new_bytes) {
            return Ok(ptr);
        }

        let new_ptr = self.allocate(new_bytes)?;
        // SAFETY: distinct live blocks never overlap; both hold at least
        // min(old, new) bytes.
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_bytes.min(new_bytes));
            self.deallocate(ptr, old_bytes);
        }
        Ok(new_ptr)
    }

    /// Refills the free list for class size `bytes` and returns one block
    ///
    /// Requests `refill_batch` blocks from [`alloc_chunk`](Self::alloc_chunk);
    /// every block after the first is linked onto the class list.
    ///
    /// # Errors
    /// - `InvalidRequest` if `bytes` is not a class size
    /// - `OutOfMemory` if no memory could be found anywhere
    pub fn refill(&self, bytes: usize) -> AllocResult<NonNull<u8>> {
        let Chunk { start, blocks } = self.alloc_chunk(bytes, self.config.refill_batch)?;
        self.record(|c| &c.refills);

        #[cfg(feature = "logging")]
        trace!(bytes, blocks, "refilled size class");

        if blocks > 1 {
            let index = size_class_index(bytes);
            // SAFETY: the chunk spans `blocks * bytes` freshly carved bytes;
            // block 0 goes to the caller, the rest are linked.
            unsafe {
                self.state
                    .borrow_mut()
                    .free_lists
                    .get_mut(index)
                    .install_chain(start.add(bytes), bytes, blocks - 1);
            }
        }
        Ok(start)
    }

    /// Carves up to `nobjs` contiguous blocks of `bytes` bytes
    ///
    /// Tries, in order:
    /// 1. the whole chunk from the arena
    /// 2. as many whole blocks as the arena still holds
    /// 3. a new arena segment of `2 * bytes * nobjs + round_up(growth >> 4)`
    ///    bytes (single system attempt), after donating the old remainder
    ///    to its exact-size free list
    /// 4. the head block of the first non-empty free list at or above
    ///    `bytes`, installed as the arena
    /// 5. `bytes * nobjs` from the raw allocator, OOM handler included
    ///
    /// # Errors
    /// - `InvalidRequest` if `bytes` is not a class size or `nobjs` is zero
    /// - `SizeOverflow` if `bytes * nobjs` overflows
    /// - `OutOfMemory` if the raw fallback fails
    /// - `InvalidState` if carving does not converge
    pub fn alloc_chunk(&self, bytes: usize, nobjs: usize) -> AllocResult<Chunk> {
        if !is_class_size(bytes) {
            return Err(AllocError::invalid_request(
                "chunk block size must be a multiple of 8 in 8..=128",
            ));
        }
        if nobjs == 0 {
            return Err(AllocError::invalid_request("chunk must contain at least one block"));
        }
        let total = bytes
            .checked_mul(nobjs)
            .ok_or_else(|| AllocError::size_overflow("chunk size"))?;

        for _ in 0..MAX_CARVE_ATTEMPTS {
            let request = {
                let mut state = self.state.borrow_mut();
                let remaining = state.arena.remaining();

                if remaining >= total {
                    #[cfg(feature = "logging")]
                    trace!(bytes, blocks = nobjs, remaining, "carving full chunk");
                    // SAFETY: total is a non-zero multiple of 8 within the arena.
                    let start = unsafe { state.arena.carve(total) };
                    return Ok(Chunk { start, blocks: nobjs });
                }

                if remaining >= bytes {
                    let blocks = remaining / bytes;
                    #[cfg(feature = "logging")]
                    trace!(bytes, blocks, remaining, "carving partial chunk");
                    // SAFETY: blocks * bytes <= remaining and is a multiple of 8.
                    let start = unsafe { state.arena.carve(blocks * bytes) };
                    return Ok(Chunk { start, blocks });
                }

                if let Some((leftover, len)) = state.arena.take_leftover() {
                    // len < bytes <= MAX_BYTES, and a multiple of 8.
                    let index = size_class_index(len);
                    // SAFETY: the leftover is uncarved arena memory of exactly class size.
                    unsafe { state.free_lists.get_mut(index).push(leftover) };
                    self.record(|c| &c.leftover_donations);
                    #[cfg(feature = "logging")]
                    debug!(len, "donated arena remainder to free list");
                }

                state.arena.growth_request(total)
            };

            let grown = request.and_then(|len| self.raw.try_allocate(len).map(|start| (start, len)));
            if let Some((start, len)) = grown {
                let mut state = self.state.borrow_mut();
                state.segments.push(Segment { start, bytes: len });
                // SAFETY: fresh system memory of `len` bytes, owned by the pool
                // until drop; the old arena was detached above.
                unsafe { state.arena.install(start, len) };
                state.arena.record_growth(len);
                self.record(|c| &c.arena_growths);
                #[cfg(feature = "logging")]
                debug!(len, growth = state.arena.growth(), "grew arena from system heap");
                continue;
            }

            let scavenged = self
                .state
                .borrow_mut()
                .free_lists
                .pop_at_or_above(size_class_index(bytes));
            if let Some((block, len)) = scavenged {
                // SAFETY: the block left its free list and is pool-owned.
                unsafe { self.state.borrow_mut().arena.install(block, len) };
                self.record(|c| &c.scavenges);
                #[cfg(feature = "logging")]
                debug!(len, bytes, "scavenged free block into arena");
                continue;
            }

            #[cfg(feature = "logging")]
            warn!(total, "system heap refused arena growth, falling back to raw allocator");
            let start = self.raw.allocate(total)?;
            self.state
                .borrow_mut()
                .segments
                .push(Segment { start, bytes: total });
            self.record(|c| &c.raw_fallbacks);
            return Ok(Chunk { start, blocks: nobjs });
        }

        Err(AllocError::invalid_state("arena carving did not converge"))
    }

    /// Number of blocks on the free list of class `index`
    ///
    /// # Panics
    /// If `index >= NUM_FREE_LISTS`.
    pub fn free_blocks(&self, index: usize) -> usize {
        assert!(index < NUM_FREE_LISTS, "size class index out of range");
        self.state.borrow().free_lists.get(index).len()
    }

    /// Bytes left in the current arena
    pub fn arena_remaining(&self) -> usize {
        self.state.borrow().arena.remaining()
    }

    /// Bytes ever fetched from the system heap for the arena
    pub fn growth_counter(&self) -> usize {
        self.state.borrow().arena.growth()
    }

    /// Statistics snapshot, if `track_stats` is enabled
    pub fn stats(&self) -> Option<PoolStats> {
        if !self.config.track_stats {
            return None;
        }

        let state = self.state.borrow();
        Some(PoolStats {
            growth_counter: state.arena.growth(),
            arena_remaining: state.arena.remaining(),
            free_blocks: state.free_lists.total_blocks(),
            free_bytes: state.free_lists.total_bytes(),
            ..self.counters.snapshot()
        })
    }

    #[inline]
    fn record(&self, counter: impl FnOnce(&PoolCounters) -> &AtomicU64) {
        if self.config.track_stats {
            PoolCounters::bump(counter(&self.counters));
        }
    }
}

impl<H: SystemHeap> Drop for PoolAllocator<H> {
    fn drop(&mut self) {
        let segments = core::mem::take(&mut self.state.get_mut().segments);
        for segment in segments {
            // SAFETY: every segment came from `self.raw` with exactly this size.
            unsafe { self.raw.deallocate(segment.start, segment.bytes) };
        }
    }
}

impl<H: SystemHeap + fmt::Debug> fmt::Debug for PoolAllocator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PoolAllocator");
        s.field("raw", &self.raw).field("config", &self.config);
        if let Ok(state) = self.state.try_borrow() {
            s.field("arena", &state.arena)
                .field("free_lists", &state.free_lists)
                .field("segments", &state.segments.len());
        }
        s.finish()
    }
}

// SAFETY: The pool exclusively owns every region its pointers refer to, so
// moving the value moves that ownership with it. `RefCell` keeps it !Sync.
unsafe impl<H: SystemHeap + Send> Send for PoolAllocator<H> {}

// SAFETY: Pooled blocks are 8-aligned class-sized slices of pool-owned
// segments; large blocks come from the raw allocator.
unsafe impl<H: SystemHeap> ByteAllocator for PoolAllocator<H> {
    #[inline]
    fn allocate(&self, bytes: usize) -> AllocResult<NonNull<u8>> {
        Self::allocate(self, bytes)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize) {
        // SAFETY: forwarded caller contract.
        unsafe { Self::deallocate(self, ptr, bytes) }
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> AllocResult<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { Self::reallocate(self, ptr, old_bytes, new_bytes) }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::allocator::{BudgetedHeap, OomAction};
    use crate::allocator::pool::DEFAULT_CHUNKS;
    use crate::utils::is_aligned_ptr;

    fn tracked() -> PoolAllocator {
        PoolAllocator::with_config(PoolConfig::debug()).unwrap()
    }

    #[test]
    fn test_first_chunk_grows_arena() {
        let pool = PoolAllocator::new();
        let chunk = pool.alloc_chunk(8, 1).unwrap();

        assert_eq!(chunk.blocks, 1);
        assert_eq!(pool.arena_remaining(), 8);
        assert_eq!(pool.growth_counter(), 16);
    }

    #[test]
    fn test_partial_chunk_from_small_arena() {
        let pool = PoolAllocator::new();
        pool.alloc_chunk(8, 1).unwrap();

        let chunk = pool.alloc_chunk(8, 2).unwrap();
        assert_eq!(chunk.blocks, 1);
        assert_eq!(pool.arena_remaining(), 0);
    }

    #[test]
    fn test_chunk_sequence_tracks_growth_and_donation() {
        let pool = tracked();
        pool.alloc_chunk(8, 1).unwrap();
        pool.alloc_chunk(8, 2).unwrap();

        let chunk = pool.alloc_chunk(16, 2).unwrap();
        assert_eq!(chunk.blocks, 2);
        assert_eq!(pool.arena_remaining(), 40);
        assert_eq!(pool.growth_counter(), 88);

        let chunk = pool.alloc_chunk(24, 2).unwrap();
        assert_eq!(chunk.blocks, 1);
        assert_eq!(pool.arena_remaining(), 16);

        let chunk = pool.alloc_chunk(24, 2).unwrap();
        assert_eq!(chunk.blocks, 2);
        assert_eq!(pool.arena_remaining(), 56);
        assert_eq!(pool.free_blocks(1), 1);

        let stats = pool.stats().unwrap();
        assert_eq!(stats.arena_growths, 3);
        assert_eq!(stats.leftover_donations, 1);
        assert_eq!(stats.growth_counter, 16 + 72 + 104);
    }

    #[test]
    fn test_refill_links_remaining_blocks() {
        let pool = PoolAllocator::new();
        let block = pool.refill(16).unwrap();

        assert_eq!(pool.free_blocks(1), DEFAULT_CHUNKS - 1);
        let next = pool.allocate(16).unwrap();
        assert_eq!(next, unsafe { block.add(16) });
    }

    #[test]
    fn test_refill_single_block_leaves_list_empty() {
        let pool = PoolAllocator::with_config(PoolConfig::default().with_refill_batch(1)).unwrap();
        pool.refill(32).unwrap();
        assert_eq!(pool.free_blocks(3), 0);
    }

    #[test]
    fn test_large_and_small_allocations() {
        let pool = tracked();
        let large = pool.allocate(160).unwrap();
        let small = pool.allocate(89).unwrap();
        assert!(is_aligned_ptr(large.as_ptr(), 8));
        assert!(is_aligned_ptr(small.as_ptr(), 8));

        unsafe {
            large.as_ptr().write_bytes(0xAA, 160);
            small.as_ptr().write_bytes(0x55, 89);
            pool.deallocate(large, 160);
            pool.deallocate(small, 89);
        }

        let stats = pool.stats().unwrap();
        assert_eq!(stats.large_allocations, 1);
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.deallocations, 1);
        assert_eq!(pool.free_blocks(size_class_index(96)), DEFAULT_CHUNKS);
    }

    #[test]
    fn test_lifo_reuse() {
        let pool = PoolAllocator::new();
        let first = pool.allocate(40).unwrap();
        unsafe { pool.deallocate(first, 40) };
        assert_eq!(pool.allocate(40).unwrap(), first);
    }

    #[test]
    fn test_zero_byte_requests() {
        let pool = PoolAllocator::new();
        assert!(pool.allocate(0).unwrap_err().is_invalid_request());

        let ptr = pool.allocate(8).unwrap();
        unsafe { pool.deallocate(ptr, 0) };
        assert!(unsafe { pool.reallocate(ptr, 8, 0) }.is_err());
        unsafe { pool.deallocate(ptr, 8) };
    }

    #[test]
    fn test_alloc_chunk_rejects_bad_parameters() {
        let pool = PoolAllocator::new();
        assert!(pool.alloc_chunk(12, 1).unwrap_err().is_invalid_request());
        assert!(pool.alloc_chunk(136, 1).unwrap_err().is_invalid_request());
        assert!(pool.alloc_chunk(8, 0).unwrap_err().is_invalid_request());
        assert!(matches!(
            pool.alloc_chunk(8, usize::MAX),
            Err(AllocError::SizeOverflow { .. })
        ));
    }

    #[test]
    fn test_reallocate_within_class_keeps_pointer() {
        let pool = PoolAllocator::new();
        let ptr = pool.allocate(17).unwrap();
        assert_eq!(unsafe { pool.reallocate(ptr, 17, 24) }.unwrap(), ptr);
        unsafe { pool.deallocate(ptr, 24) };
    }

    #[test]
    fn test_reallocate_across_tiers_copies() {
        let pool = PoolAllocator::new();
        unsafe {
            let ptr = pool.allocate(16).unwrap();
            for i in 0..16u8 {
                ptr.as_ptr().add(usize::from(i)).write(i);
            }

            let grown = pool.reallocate(ptr, 16, 300).unwrap();
            for i in 0..16u8 {
                assert_eq!(*grown.as_ptr().add(usize::from(i)), i);
            }
            assert_eq!(pool.free_blocks(1), DEFAULT_CHUNKS);

            let shrunk = pool.reallocate(grown, 300, 8).unwrap();
            assert_eq!(*shrunk.as_ptr().add(7), 7);
            pool.deallocate(shrunk, 8);
        }
    }

    #[test]
    fn test_dealloc_pattern_fills_block() {
        let pool = tracked();
        let ptr = pool.allocate(32).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0, 32);
            pool.deallocate(ptr, 32);
            // First word now links the free list; the tail keeps the pattern.
            assert_eq!(*ptr.as_ptr().add(31), 0xDD);
        }
    }

    #[test]
    fn test_scavenges_before_raw_fallback() {
        let heap = Arc::new(BudgetedHeap::new(256));
        let config = PoolConfig::debug().with_refill_batch(1);
        let pool = PoolAllocator::with_heap(Arc::clone(&heap), config).unwrap();

        let a = pool.allocate(128).unwrap();
        let _b = pool.allocate(128).unwrap();
        assert_eq!(pool.arena_remaining(), 0);
        unsafe { pool.deallocate(a, 128) };

        // Growth is refused, so the freed 128-byte block becomes the arena.
        let small = pool.allocate(8).unwrap();
        assert_eq!(small, a);
        assert_eq!(pool.arena_remaining(), 120);
        assert_eq!(heap.denied(), 1);

        let stats = pool.stats().unwrap();
        assert_eq!(stats.scavenges, 1);
        assert_eq!(stats.raw_fallbacks, 0);

        // Nothing left to scavenge: the raw fallback runs and fails.
        let err = pool.allocate(128).unwrap_err();
        assert!(err.is_out_of_memory());
        assert_eq!(pool.free_blocks(size_class_index(120)), 1);

        let relief = Arc::clone(&heap);
        pool.set_oom_handler(Some(Arc::new(move || {
            relief.set_limit(usize::MAX);
            OomAction::Retry
        })));
        pool.allocate(128).unwrap();
        assert_eq!(pool.stats().unwrap().raw_fallbacks, 1);
        assert_eq!(pool.raw().oom_invocations(), 1);

        drop(pool);
        assert_eq!(heap.used(), 0);
    }

    #[test]
    fn test_drop_returns_segments() {
        let heap = Arc::new(BudgetedHeap::new(usize::MAX));
        {
            let pool = PoolAllocator::with_heap(Arc::clone(&heap), PoolConfig::default()).unwrap();
            for bytes in [8, 24, 64, 128] {
                pool.allocate(bytes).unwrap();
            }
            let large = pool.allocate(4096).unwrap();
            unsafe { pool.deallocate(large, 4096) };
            assert!(heap.used() > 0);
        }
        assert_eq!(heap.used(), 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = PoolConfig::default().with_refill_batch(0);
        assert!(PoolAllocator::with_config(config).is_err());
    }

    #[test]
    fn test_stats_disabled() {
        let pool = PoolAllocator::production();
        pool.allocate(8).unwrap();
        assert!(pool.stats().is_none());
    }
}
