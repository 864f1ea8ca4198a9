//! Bump region the free lists are refilled from
//!
//! # Safety
//!
//! The arena is the half-open range `[cursor, limit)` inside memory the pool
//! owns exclusively. Both pointers are null while no region is installed.
//!
//! ## Invariants
//!
//! - `limit - cursor` is a multiple of `ALIGN`
//! - `cursor` is aligned to `ALIGN`
//! - bytes below `cursor` have been handed out and are never revisited

use core::fmt;
use core::ptr::{self, NonNull};

use super::size_class::ALIGN;
use crate::utils::{checked_align_up, is_aligned};

pub(crate) struct Arena {
    cursor: *mut u8,
    limit: *mut u8,
    /// Bytes ever fetched from the system heap for the arena
    growth: usize,
}

impl Arena {
    pub(crate) const fn new() -> Self {
        Self {
            cursor: ptr::null_mut(),
            limit: ptr::null_mut(),
            growth: 0,
        }
    }

    /// Bytes left between cursor and limit
    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.limit as usize - self.cursor as usize
    }

    pub(crate) fn growth(&self) -> usize {
        self.growth
    }

    /// Hands out the next `bytes` bytes of the region
    ///
    /// # Safety
    /// `bytes` must be a non-zero multiple of `ALIGN` no larger than
    /// [`remaining`](Self::remaining).
    pub(crate) unsafe fn carve(&mut self, bytes: usize) -> NonNull<u8> {
        debug_assert!(bytes > 0 && bytes <= self.remaining());
        debug_assert!(is_aligned(bytes, ALIGN));

        // SAFETY: remaining() >= bytes > 0, so cursor is non-null.
        let start = unsafe { NonNull::new_unchecked(self.cursor) };
        // SAFETY: the result stays within [cursor, limit].
        self.cursor = unsafe { self.cursor.add(bytes) };
        start
    }

    /// Detaches whatever is left of the region, leaving the arena empty
    pub(crate) fn take_leftover(&mut self) -> Option<(NonNull<u8>, usize)> {
        let len = self.remaining();
        let start = NonNull::new(self.cursor);
        self.cursor = ptr::null_mut();
        self.limit = ptr::null_mut();

        start.filter(|_| len > 0).map(|start| (start, len))
    }

    /// Makes `[start, start + len)` the current region
    ///
    /// # Safety
    /// The range must be exclusively owned by the pool, aligned to `ALIGN`,
    /// and stay valid for as long as the pool lives. `len` must be a
    /// multiple of `ALIGN`. Any previous region must already be detached.
    pub(crate) unsafe fn install(&mut self, start: NonNull<u8>, len: usize) {
        debug_assert_eq!(self.remaining(), 0);
        debug_assert!(is_aligned(len, ALIGN));
        debug_assert!(is_aligned(start.as_ptr() as usize, ALIGN));

        self.cursor = start.as_ptr();
        // SAFETY: caller guarantees `len` bytes starting at `start`.
        self.limit = unsafe { start.as_ptr().add(len) };
    }

    /// Adds a system segment of `bytes` bytes to the growth counter
    pub(crate) fn record_growth(&mut self, bytes: usize) {
        self.growth = self.growth.saturating_add(bytes);
    }

    /// Size of the next system segment for a chunk of `total` bytes:
    /// twice the chunk plus a sixteenth of everything fetched so far
    ///
    /// Returns `None` when the request does not fit in `usize`.
    pub(crate) fn growth_request(&self, total: usize) -> Option<usize> {
        total
            .checked_mul(2)?
            .checked_add(checked_align_up(self.growth >> 4, ALIGN)?)
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("cursor", &self.cursor)
            .field("remaining", &self.remaining())
            .field("growth", &self.growth)
            .finish()
    }
}
