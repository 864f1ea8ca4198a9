//! Byte-count allocator contract
//!
//! Collaborators (containers, the typed front end, lifecycle helpers) talk
//! to an allocator through four operations: allocate, deallocate,
//! reallocate and out-of-memory handler installation. The first three live
//! on [`ByteAllocator`]; handler installation is inherent on the concrete
//! allocators because it is configuration rather than a per-request call.
//!
//! # Safety
//!
//! Unlike `core::alloc::GlobalAlloc`, every operation is sized in bytes and
//! alignment is fixed at [`ALIGN`](crate::allocator::ALIGN). Neither tier
//! records block sizes, so deallocation trusts the caller's byte count.

use core::ptr::NonNull;

use super::AllocResult;

/// Allocator addressed purely by byte counts
///
/// # Safety
///
/// Implementors must ensure that:
/// - Returned pointers are valid for reads and writes of the requested
///   number of bytes and aligned to at least [`ALIGN`](crate::allocator::ALIGN)
/// - Distinct live allocations never overlap
/// - A failed call leaves previously returned pointers untouched
pub unsafe trait ByteAllocator {
    /// Allocates `bytes` bytes of uninitialized memory
    ///
    /// # Errors
    /// - `OutOfMemory` if the system heap is exhausted
    /// - `InvalidRequest` if the implementation rejects the size
    fn allocate(&self, bytes: usize) -> AllocResult<NonNull<u8>>;

    /// Returns `bytes` bytes at `ptr` to the allocator
    ///
    /// # Safety
    /// - `ptr` must have been returned by this allocator
    /// - `bytes` must equal the size it was allocated (or last reallocated) with
    /// - `ptr` must not be used afterwards
    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize);

    /// Resizes an allocation, preserving `min(old_bytes, new_bytes)` bytes
    ///
    /// On success the old pointer is invalid. On failure it stays valid
    /// with `old_bytes`.
    ///
    /// # Safety
    /// Same requirements as [`deallocate`](Self::deallocate) for `ptr` and
    /// `old_bytes`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> AllocResult<NonNull<u8>>;
}

// SAFETY: Blanket impl forwards every call to the underlying allocator, so
// the contract is inherited unchanged.
unsafe impl<A: ByteAllocator + ?Sized> ByteAllocator for &A {
    #[inline]
    fn allocate(&self, bytes: usize) -> AllocResult<NonNull<u8>> {
        (**self).allocate(bytes)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).deallocate(ptr, bytes) }
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> AllocResult<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).reallocate(ptr, old_bytes, new_bytes) }
    }
}
