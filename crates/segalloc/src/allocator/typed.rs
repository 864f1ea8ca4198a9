//! Element-count front end over a [`ByteAllocator`]
//!
//! Translates "N values of `T`" into byte counts. The allocation policy is
//! chosen per instantiation through the `A` parameter, so the same
//! container code can run on the pool or directly on the raw tier.

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use super::{ALIGN, AllocError, AllocResult, ByteAllocator};

/// Typed view of a byte allocator
///
/// Types aligned above 8 bytes are rejected: neither tier guarantees more.
///
/// # Examples
/// ```
/// use segalloc::allocator::{PoolAllocator, TypedAllocator};
///
/// let pool = PoolAllocator::new();
/// let typed = TypedAllocator::<u64, _>::new(&pool);
///
/// let values = typed.allocate(4)?;
/// unsafe {
///     for i in 0..4 {
///         values.as_ptr().add(i).write(i as u64 * 10);
///     }
///     assert_eq!(*values.as_ptr().add(3), 30);
///     typed.deallocate(values, 4);
/// }
/// # Ok::<(), segalloc::MemoryError>(())
/// ```
pub struct TypedAllocator<T, A: ByteAllocator> {
    alloc: A,
    _marker: PhantomData<fn() -> T>,
}

impl<T, A: ByteAllocator> TypedAllocator<T, A> {
    /// Wraps `alloc`
    pub const fn new(alloc: A) -> Self {
        Self {
            alloc,
            _marker: PhantomData,
        }
    }

    /// The underlying byte allocator
    pub fn inner(&self) -> &A {
        &self.alloc
    }

    /// Unwraps the underlying byte allocator
    pub fn into_inner(self) -> A {
        self.alloc
    }

    /// Bytes occupied by `count` values of `T`
    ///
    /// # Errors
    /// - `InvalidLayout` if `T` needs more than 8-byte alignment
    /// - `SizeOverflow` if the product does not fit in `usize`
    pub fn bytes_for(count: usize) -> AllocResult<usize> {
        if align_of::<T>() > ALIGN {
            return Err(AllocError::invalid_layout("type alignment exceeds 8 bytes"));
        }
        count
            .checked_mul(size_of::<T>())
            .ok_or_else(|| AllocError::size_overflow("element count times element size"))
    }

    /// Allocates uninitialized storage for `count` values
    ///
    /// Zero elements or a zero-sized `T` yield a dangling, well-aligned
    /// pointer without touching the allocator.
    ///
    /// # Errors
    /// See [`bytes_for`](Self::bytes_for), plus whatever `A` reports.
    pub fn allocate(&self, count: usize) -> AllocResult<NonNull<T>> {
        let bytes = Self::bytes_for(count)?;
        if bytes == 0 {
            return Ok(NonNull::dangling());
        }
        Ok(self.alloc.allocate(bytes)?.cast())
    }

    /// Allocates storage for a single value
    pub fn allocate_one(&self) -> AllocResult<NonNull<T>> {
        self.allocate(1)
    }

    /// Releases storage for `count` values
    ///
    /// Nothing is dropped; destroy the values first if they need it.
    ///
    /// # Safety
    /// `ptr` must come from [`allocate`](Self::allocate) on this front with
    /// the same `count`, and must not be used afterwards.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        // `count` was accepted by `allocate`, so the product cannot overflow.
        let bytes = count * size_of::<T>();
        if bytes == 0 {
            return;
        }
        // SAFETY: forwarded caller contract, same byte count as allocation.
        unsafe { self.alloc.deallocate(ptr.cast(), bytes) };
    }

    /// Releases storage for a single value
    ///
    /// # Safety
    /// As for [`deallocate`](Self::deallocate) with `count == 1`.
    pub unsafe fn deallocate_one(&self, ptr: NonNull<T>) {
        // SAFETY: forwarded caller contract.
        unsafe { self.deallocate(ptr, 1) };
    }

    /// Allocates one slot and moves `value` into it
    pub fn alloc_init(&self, value: T) -> AllocResult<NonNull<T>> {
        let ptr = self.allocate_one()?;
        // SAFETY: fresh, aligned storage for one `T`.
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }
}

impl<T, A: ByteAllocator + Clone> Clone for TypedAllocator<T, A> {
    fn clone(&self) -> Self {
        Self::new(self.alloc.clone())
    }
}

impl<T, A: ByteAllocator + Copy> Copy for TypedAllocator<T, A> {}

impl<T, A: ByteAllocator + fmt::Debug> fmt::Debug for TypedAllocator<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedAllocator")
            .field("type", &core::any::type_name::<T>())
            .field("alloc", &self.alloc)
            .finish()
    }
}
