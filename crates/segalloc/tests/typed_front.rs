//! Typed front end and lifecycle helpers over both tiers

#![allow(unsafe_code)]

use std::ptr::NonNull;

use segalloc::allocator::{ByteAllocator, PoolAllocator, RawAllocator, TypedAllocator};
use segalloc::lifecycle::{destroy_range, uninitialized_copy, uninitialized_fill_n};
use segalloc::MemoryError;

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

/// Minimal growable buffer generic over the allocation policy
struct Buffer<T, A: ByteAllocator> {
    alloc: TypedAllocator<T, A>,
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
}

impl<T: Clone, A: ByteAllocator> Buffer<T, A> {
    fn new(alloc: A) -> Self {
        Self {
            alloc: TypedAllocator::new(alloc),
            ptr: NonNull::dangling(),
            len: 0,
            cap: 0,
        }
    }

    fn push(&mut self, value: T) -> Result<(), MemoryError> {
        if self.len == self.cap {
            let new_cap = (self.cap * 2).max(4);
            let new_ptr = self.alloc.allocate(new_cap)?;
            unsafe {
                let items = std::slice::from_raw_parts(self.ptr.as_ptr(), self.len);
                uninitialized_copy(items, new_ptr);
                destroy_range(self.ptr, self.len);
                self.alloc.deallocate(self.ptr, self.cap);
            }
            self.ptr = new_ptr;
            self.cap = new_cap;
        }
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T, A: ByteAllocator> Drop for Buffer<T, A> {
    fn drop(&mut self) {
        unsafe {
            destroy_range(self.ptr, self.len);
            self.alloc.deallocate(self.ptr, self.cap);
        }
    }
}

#[test]
fn test_buffer_on_pool_and_raw() {
    let pool = PoolAllocator::new();
    let raw = RawAllocator::new();

    let mut pooled = Buffer::new(&pool);
    let mut direct = Buffer::new(&raw);
    for i in 0..100 {
        let p = Point {
            x: f64::from(i),
            y: -f64::from(i),
        };
        pooled.push(p.clone()).unwrap();
        direct.push(p).unwrap();
    }

    assert_eq!(pooled.as_slice(), direct.as_slice());
    assert_eq!(pooled.as_slice()[99].y, -99.0);
}

#[test]
fn test_buffer_of_strings_drops_cleanly() {
    let pool = PoolAllocator::new();
    let mut names = Buffer::new(&pool);
    for i in 0..33 {
        names.push(format!("block-{i}")).unwrap();
    }
    assert_eq!(names.as_slice()[32], "block-32");
}

#[test]
fn test_fill_pooled_storage() {
    let pool = PoolAllocator::new();
    let typed = TypedAllocator::<Point, _>::new(&pool);

    let origin = Point { x: 0.0, y: 0.0 };
    let ptr = typed.allocate(6).unwrap();
    unsafe {
        uninitialized_fill_n(ptr, 6, &origin);
        let items = std::slice::from_raw_parts(ptr.as_ptr(), 6);
        assert!(items.iter().all(|p| *p == origin));
        destroy_range(ptr, 6);
        typed.deallocate(ptr, 6);
    }
}

#[test]
fn test_typed_errors_surface() {
    let pool = PoolAllocator::new();
    let typed = TypedAllocator::<u128, _>::new(&pool);

    // u128 is 16-aligned on most targets; the pool only guarantees 8.
    if align_of::<u128>() > 8 {
        assert_eq!(typed.allocate(1).unwrap_err().code(), "MEM:ALLOC:LAYOUT");
    }

    let bytes = TypedAllocator::<[u8; 3], _>::new(&pool);
    assert_eq!(bytes.allocate(usize::MAX).unwrap_err().code(), "MEM:ALLOC:OVERFLOW");
}
