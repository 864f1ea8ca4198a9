//! System heap primitives
//!
//! The allocator stack consumes exactly three primitives from its
//! environment: allocate, free and resize. [`SystemHeap`] names that seam.
//! Primitives report failure with a null pointer, exactly like the host
//! allocator; turning a null into an error (or a retry) is the job of
//! [`RawAllocator`](super::RawAllocator).
//!
//! Two heaps ship with the crate:
//! - [`SystemAllocator`] delegates to the platform allocator
//! - [`BudgetedHeap`] wraps another heap and refuses requests past a quota

use core::alloc::{GlobalAlloc, Layout};
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::alloc::System;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Source of raw memory for the allocator tiers
///
/// # Safety
///
/// Implementors must behave like [`GlobalAlloc`]:
/// - a non-null result is valid for `layout.size()` bytes and aligned to
///   `layout.align()`
/// - failure is reported by returning null, never by unwinding
/// - `dealloc` and `realloc` accept any pointer previously returned by the
///   same heap with the layout it was obtained with
pub unsafe trait SystemHeap {
    /// Allocates `layout.size()` bytes, returning null on failure
    ///
    /// # Safety
    /// `layout.size()` must be non-zero.
    unsafe fn alloc(&self, layout: Layout) -> *mut u8;

    /// Returns memory to the heap
    ///
    /// # Safety
    /// `ptr` must come from this heap with exactly `layout`.
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout);

    /// Resizes an allocation, returning null (and leaving `ptr` valid) on failure
    ///
    /// # Safety
    /// `ptr` must come from this heap with exactly `layout`, and `new_size`
    /// must be non-zero and not overflow `isize` once aligned.
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8;
}

/// Wrapper for the system's default allocator
///
/// This heap delegates all operations to [`std::alloc::System`].
///
/// # Thread Safety
/// The system allocator is inherently thread-safe as it uses the platform's
/// default memory management which handles concurrent allocations properly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Creates a new SystemAllocator
    ///
    /// This is a zero-cost operation as the SystemAllocator contains no state.
    #[inline]
    pub const fn new() -> Self {
        SystemAllocator
    }
}

// SAFETY: Pure delegation to `System`, which upholds the `GlobalAlloc`
// contract the trait mirrors.
unsafe impl SystemHeap for SystemAllocator {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller guarantees a non-zero size.
        unsafe { System.alloc(layout) }
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: caller guarantees `ptr` came from `System` with `layout`.
        unsafe { System.dealloc(ptr, layout) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: caller guarantees `ptr`/`layout` provenance and a valid new size.
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

// SAFETY: Forwarding through a shared reference preserves every guarantee
// of the underlying heap.
unsafe impl<H: SystemHeap + ?Sized> SystemHeap for &H {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).alloc(layout) }
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).dealloc(ptr, layout) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).realloc(ptr, layout, new_size) }
    }
}

// SAFETY: Same as the `&H` forwarding impl; the `Arc` keeps the heap alive.
unsafe impl<H: SystemHeap + ?Sized> SystemHeap for Arc<H> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).alloc(layout) }
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).dealloc(ptr, layout) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).realloc(ptr, layout, new_size) }
    }
}

/// Heap wrapper that enforces a byte quota
///
/// Tracks the bytes currently outstanding against the inner heap and
/// returns null for any request that would push the total past `limit`.
/// The limit can be raised or lowered at runtime, which makes this the
/// natural partner for an OOM handler: the handler relaxes the budget and
/// asks for a retry.
///
/// ```
/// use std::alloc::Layout;
/// use segalloc::allocator::{BudgetedHeap, SystemHeap};
///
/// let heap = BudgetedHeap::new(64);
/// let layout = Layout::from_size_align(128, 8).unwrap();
/// assert!(unsafe { heap.alloc(layout) }.is_null());
/// assert_eq!(heap.denied(), 1);
/// ```
#[derive(Debug)]
pub struct BudgetedHeap<H: SystemHeap = SystemAllocator> {
    inner: H,
    limit: AtomicUsize,
    used: AtomicUsize,
    denied: AtomicU64,
}

impl BudgetedHeap<SystemAllocator> {
    /// Creates a budgeted view of the system allocator
    pub const fn new(limit: usize) -> Self {
        Self::with_heap(SystemAllocator::new(), limit)
    }
}

impl<H: SystemHeap> BudgetedHeap<H> {
    /// Wraps an arbitrary heap with a byte quota
    pub const fn with_heap(inner: H, limit: usize) -> Self {
        Self {
            inner,
            limit: AtomicUsize::new(limit),
            used: AtomicUsize::new(0),
            denied: AtomicU64::new(0),
        }
    }

    /// Current quota in bytes
    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    /// Replaces the quota, returning the previous one
    ///
    /// Lowering the limit below [`used`](Self::used) never reclaims memory;
    /// it only makes further requests fail.
    pub fn set_limit(&self, limit: usize) -> usize {
        self.limit.swap(limit, Ordering::Relaxed)
    }

    /// Bytes currently outstanding against the inner heap
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    /// Bytes that can still be requested before the quota is hit
    pub fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.used())
    }

    /// Number of requests refused because of the quota
    pub fn denied(&self) -> u64 {
        self.denied.load(Ordering::Relaxed)
    }

    /// Reserves `bytes` against the quota
    fn reserve(&self, bytes: usize) -> bool {
        let limit = self.limit();
        let reserved = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(bytes).filter(|&total| total <= limit)
            })
            .is_ok();

        if !reserved {
            self.denied.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "logging")]
            trace!(bytes, limit, "budgeted heap refused request");
        }
        reserved
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

// SAFETY: Every non-null pointer comes straight from the inner heap; the
// budget only decides whether the inner heap is consulted at all.
unsafe impl<H: SystemHeap> SystemHeap for BudgetedHeap<H> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if !self.reserve(layout.size()) {
            return core::ptr::null_mut();
        }

        // SAFETY: forwarded caller contract.
        let ptr = unsafe { self.inner.alloc(layout) };
        if ptr.is_null() {
            self.release(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { self.inner.dealloc(ptr, layout) };
        self.release(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let old_size = layout.size();
        if new_size > old_size && !self.reserve(new_size - old_size) {
            return core::ptr::null_mut();
        }

        // SAFETY: forwarded caller contract.
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };

        if new_ptr.is_null() {
            if new_size > old_size {
                self.release(new_size - old_size);
            }
        } else if new_size < old_size {
            self.release(old_size - new_size);
        }
        new_ptr
    }
}
