//! Size classes for pooled allocations
//!
//! Requests of 1..=[`MAX_BYTES`] bytes are rounded up to a multiple of
//! [`ALIGN`] and served from one of [`NUM_FREE_LISTS`] free lists:
//!
//! ```text
//! class:  0   1   2   3  ...  14   15
//! bytes:  8  16  24  32  ... 120  128
//! ```
//!
//! Anything larger bypasses pooling entirely.

use crate::utils::align_up;

/// Alignment (and granularity) of every pooled block
pub const ALIGN: usize = 8;

/// Largest request served from the free lists
pub const MAX_BYTES: usize = 128;

/// Number of size classes, one free list each
pub const NUM_FREE_LISTS: usize = MAX_BYTES / ALIGN;

/// Blocks requested from the arena when a free list runs dry
pub const DEFAULT_CHUNKS: usize = 20;

const _: () = assert!(ALIGN >= size_of::<usize>(), "a free block must hold a pointer");
const _: () = assert!(MAX_BYTES % ALIGN == 0);

/// Rounds `bytes` up to the nearest multiple of [`ALIGN`]
///
/// `round_up(0) == 0`; a zero-byte request is invalid and never reaches a
/// free list.
///
/// ```
/// use segalloc::allocator::pool::round_up;
///
/// assert_eq!(round_up(1), 8);
/// assert_eq!(round_up(89), 96);
/// assert_eq!(round_up(128), 128);
/// ```
#[inline(always)]
pub const fn round_up(bytes: usize) -> usize {
    align_up(bytes, ALIGN)
}

/// Free-list index for a request of `bytes` bytes: `ceil(bytes / 8) - 1`
///
/// `bytes` must lie in `1..=MAX_BYTES`.
///
/// ```
/// use segalloc::allocator::pool::size_class_index;
///
/// assert_eq!(size_class_index(8), 0);
/// assert_eq!(size_class_index(88), 10);
/// assert_eq!(size_class_index(128), 15);
/// ```
#[inline(always)]
pub const fn size_class_index(bytes: usize) -> usize {
    debug_assert!(bytes > 0 && bytes <= MAX_BYTES);
    bytes.div_ceil(ALIGN) - 1
}

/// Block size served by free list `index`
#[inline(always)]
pub const fn class_size(index: usize) -> usize {
    debug_assert!(index < NUM_FREE_LISTS);
    (index + 1) * ALIGN
}

/// Whether `bytes` is served from the free lists
#[inline(always)]
pub const fn is_pooled(bytes: usize) -> bool {
    bytes <= MAX_BYTES
}

/// Whether `bytes` is exactly one of the class sizes
#[inline(always)]
pub const fn is_class_size(bytes: usize) -> bool {
    bytes >= ALIGN && bytes <= MAX_BYTES && bytes % ALIGN == 0
}
