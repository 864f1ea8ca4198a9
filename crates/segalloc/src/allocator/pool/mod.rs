//! Pooled small-object allocator
//!
//! Sixteen LIFO free lists, one per 8-byte size class up to 128 bytes,
//! refilled in batches from a bump arena that grows geometrically from the
//! system heap.
//!
//! ## Modules
//! - `allocator` - `PoolAllocator`: allocate, deallocate, refill, chunk carving
//! - `arena` - bump region with the growth counter
//! - `config` - Configuration variants (production, debug, performance)
//! - `free_list` - intrusive free lists
//! - `size_class` - size class arithmetic and constants
//! - `stats` - Statistics tracking types

pub mod allocator;
mod arena;
pub mod config;
mod free_list;
pub mod size_class;
pub mod stats;

pub use allocator::{Chunk, PoolAllocator};
pub use config::{MAX_REFILL_BATCH, PoolConfig};
pub use size_class::{
    ALIGN, DEFAULT_CHUNKS, MAX_BYTES, NUM_FREE_LISTS, class_size, round_up, size_class_index,
};
pub use stats::PoolStats;
