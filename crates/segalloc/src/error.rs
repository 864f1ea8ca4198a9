//! Standalone error types for segalloc
//!
//! Uses thiserror for clean, idiomatic Rust error definitions. Every
//! fallible allocator entry point returns [`MemoryResult`], so running out
//! of memory is always an observable error value and never a null pointer.

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{error, warn};

// ============================================================================
// Main Error Types
// ============================================================================

/// Memory allocation errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    // --- Allocation Errors ---
    #[error("Out of memory: {size} bytes could not be obtained from the system heap")]
    OutOfMemory { size: usize },

    #[error("Invalid allocation request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: String },

    #[error("Invalid memory layout: {reason}")]
    InvalidLayout { reason: String },

    // --- Configuration Errors ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // --- System Errors ---
    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },
}

impl MemoryError {
    /// Check if error is retryable
    ///
    /// Only exhaustion is transient: the caller may release memory and try
    /// again. Every other variant describes a request that will never succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// Check if this is an out-of-memory error
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// Check if this is an invalid request error
    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfMemory { .. } => "MEM:ALLOC:OOM",
            Self::InvalidRequest { .. } => "MEM:ALLOC:REQUEST",
            Self::SizeOverflow { .. } => "MEM:ALLOC:OVERFLOW",
            Self::InvalidLayout { .. } => "MEM:ALLOC:LAYOUT",
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
            Self::InvalidState { .. } => "MEM:SYSTEM:STATE",
        }
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create out of memory error
    pub fn out_of_memory(size: usize) -> Self {
        #[cfg(feature = "logging")]
        error!(size, "system heap exhausted");

        Self::OutOfMemory { size }
    }

    /// Create invalid request error
    pub fn invalid_request(reason: &str) -> Self {
        #[cfg(feature = "logging")]
        warn!(reason, "rejected allocation request");

        Self::InvalidRequest {
            reason: reason.to_string(),
        }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &str) -> Self {
        Self::SizeOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create invalid layout error
    pub fn invalid_layout(reason: &str) -> Self {
        Self::InvalidLayout {
            reason: reason.to_string(),
        }
    }

    /// Create invalid pool config error
    pub fn invalid_pool_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: format!("invalid pool config: {reason}"),
        }
    }

    /// Create invalid state error
    pub fn invalid_state(reason: &str) -> Self {
        #[cfg(feature = "logging")]
        error!(reason, "allocator reached an invalid state");

        Self::InvalidState {
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Generic result type alias
pub type Result<T> = MemoryResult<T>;

/// Type aliases used throughout the allocator module
pub type AllocError = MemoryError;
pub type AllocResult<T> = MemoryResult<T>;

// ============================================================================
// Tests
// ============================================================================
