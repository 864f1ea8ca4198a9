//! Allocator tiers
//!
//! - [`SystemHeap`] - environment primitives (platform or budgeted)
//! - [`RawAllocator`] - system heap plus the OOM retry protocol
//! - [`PoolAllocator`] - segregated free lists for requests up to 128 bytes
//! - [`TypedAllocator`] - element counts over any [`ByteAllocator`]

// Core allocator types
mod raw;
mod system;
mod traits;
mod typed;

// Pooled tier
pub mod pool;

// Re-exports for convenience
pub use crate::error::{AllocError, AllocResult};
pub use pool::{
    ALIGN, Chunk, DEFAULT_CHUNKS, MAX_BYTES, NUM_FREE_LISTS, PoolAllocator, PoolConfig, PoolStats,
};
pub use raw::{OomAction, OomHandler, RawAllocator};
pub use system::{BudgetedHeap, SystemAllocator, SystemHeap};
pub use traits::ByteAllocator;
pub use typed::TypedAllocator;
