//! # segalloc
//!
//! Two-tier memory allocator with segregated free lists.
//!
//! - A **raw tier** wraps the system heap and adds an out-of-memory retry
//!   protocol driven by a user-installed handler
//! - A **pooled tier** serves 1..=128 byte requests from 16 segregated LIFO
//!   free lists, refilled in batches from a geometrically growing arena
//!
//! ## Quick Start
//!
//! ```rust
//! use segalloc::prelude::*;
//!
//! let pool = PoolAllocator::new();
//!
//! // Small requests come from a size-class free list
//! let small = pool.allocate(24)?;
//!
//! // Large requests go straight to the system heap
//! let large = pool.allocate(4096)?;
//!
//! unsafe {
//!     pool.deallocate(small, 24);
//!     pool.deallocate(large, 4096);
//! }
//!
//! // Typed front end
//! let typed = TypedAllocator::<u64, _>::new(&pool);
//! let value = typed.alloc_init(7)?;
//! unsafe { typed.deallocate_one(value) };
//! # Ok::<(), MemoryError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured logging of refills, arena growth,
//!   scavenging and OOM handling via `tracing`
//!
//! ## Architecture
//!
//! - Standalone error handling via [`error`] module
//! - Allocator tiers in [`allocator`]
//! - Construct/destroy helpers in [`lifecycle`]

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rust_2018_idioms)]
#![allow(unsafe_code)]

// Error types
pub mod error;

// Core modules
pub mod allocator;
pub mod lifecycle;
pub mod utils;

// Re-export core types for convenience
pub use crate::error::{AllocError, AllocResult, MemoryError, MemoryResult, Result};

// Public API exports
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    // Error types
    pub use crate::error::{MemoryError, MemoryResult, Result};

    // Allocator types
    pub use crate::allocator::{
        AllocError, AllocResult, BudgetedHeap, ByteAllocator, OomAction, OomHandler,
        PoolAllocator, PoolConfig, PoolStats, RawAllocator, SystemAllocator, SystemHeap,
        TypedAllocator,
    };

    // Lifecycle helpers
    pub use crate::lifecycle::{construct, destroy, destroy_range};
}
