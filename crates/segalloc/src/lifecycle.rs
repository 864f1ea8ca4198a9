//! Construct and destroy values in allocator-provided storage
//!
//! Storage from [`TypedAllocator`](crate::allocator::TypedAllocator) is
//! uninitialized; these helpers move values in and drop them in place
//! without touching the allocator.
//!
//! # Safety
//!
//! Every function takes raw pointers and trusts the caller for validity,
//! alignment and initialization state, as documented per function.

use core::mem::ManuallyDrop;
use core::ptr::{self, NonNull};

/// Writes `value` into uninitialized storage
///
/// # Safety
/// `ptr` must be valid for writes and aligned. Any previous value is
/// overwritten without being dropped.
#[inline]
pub unsafe fn construct<T>(ptr: NonNull<T>, value: T) {
    // SAFETY: forwarded caller contract.
    unsafe { ptr.as_ptr().write(value) };
}

/// Writes `T::default()` into uninitialized storage
///
/// # Safety
/// As for [`construct`].
#[inline]
pub unsafe fn construct_default<T: Default>(ptr: NonNull<T>) {
    // SAFETY: forwarded caller contract.
    unsafe { construct(ptr, T::default()) };
}

/// Drops the value at `ptr` in place, leaving the storage uninitialized
///
/// # Safety
/// `ptr` must point at an initialized `T` that is not used afterwards.
#[inline]
pub unsafe fn destroy<T>(ptr: NonNull<T>) {
    // SAFETY: forwarded caller contract.
    unsafe { ptr::drop_in_place(ptr.as_ptr()) };
}

/// Drops `count` consecutive values starting at `ptr`
///
/// Compiles to nothing for types without drop glue.
///
/// # Safety
/// `ptr` must point at `count` initialized, contiguous values that are not
/// used afterwards.
#[inline]
pub unsafe fn destroy_range<T>(ptr: NonNull<T>, count: usize) {
    if !core::mem::needs_drop::<T>() {
        return;
    }
    // SAFETY: forwarded caller contract.
    unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(ptr.as_ptr(), count)) };
}

/// Fills `count` uninitialized slots with clones of `value`
///
/// If a clone panics, the slots already written are dropped before the
/// panic propagates.
///
/// # Safety
/// `ptr` must be valid for writes of `count` contiguous, aligned values.
pub unsafe fn uninitialized_fill_n<T: Clone>(ptr: NonNull<T>, count: usize, value: &T) {
    let mut guard = InitGuard { start: ptr, written: 0 };
    while guard.written < count {
        // SAFETY: `written < count` stays inside the caller's region.
        unsafe { ptr.as_ptr().add(guard.written).write(value.clone()) };
        guard.written += 1;
    }
    guard.disarm();
}

/// Clones `src` into uninitialized storage starting at `dst`
///
/// Returns the pointer one past the last written element. Panics from
/// `Clone` drop the elements already written.
///
/// # Safety
/// `dst` must be valid for writes of `src.len()` contiguous, aligned values
/// and must not overlap `src`.
pub unsafe fn uninitialized_copy<T: Clone>(src: &[T], dst: NonNull<T>) -> NonNull<T> {
    let mut guard = InitGuard { start: dst, written: 0 };
    for item in src {
        // SAFETY: at most `src.len()` writes, within the caller's region.
        unsafe { dst.as_ptr().add(guard.written).write(item.clone()) };
        guard.written += 1;
    }
    guard.disarm();
    // SAFETY: one past the end of the written range.
    unsafe { dst.add(src.len()) }
}

/// Drops a partially initialized prefix on unwind
struct InitGuard<T> {
    start: NonNull<T>,
    written: usize,
}

impl<T> InitGuard<T> {
    /// Keeps the written values alive
    fn disarm(self) {
        let _ = ManuallyDrop::new(self);
    }
}

impl<T> Drop for InitGuard<T> {
    fn drop(&mut self) {
        // SAFETY: exactly `written` leading slots were initialized.
        unsafe { destroy_range(self.start, self.written) };
    }
}
