//! Raw allocator tier
//!
//! A thin wrapper over a [`SystemHeap`] that adds the out-of-memory retry
//! protocol. When the heap refuses a request, the installed [`OomHandler`]
//! is invoked; it is expected to release memory somewhere and answer with
//! [`OomAction::Retry`], or to give up with [`OomAction::Fail`]. Without a
//! handler the failure surfaces immediately as
//! [`MemoryError::OutOfMemory`](crate::MemoryError::OutOfMemory).
//!
//! The retry loop has no iteration bound: progress depends entirely on the
//! handler eventually freeing enough memory, giving up, or panicking.

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

#[cfg(feature = "logging")]
use tracing::warn;

use super::{ALIGN, AllocError, AllocResult, ByteAllocator, SystemAllocator, SystemHeap};
use crate::utils::dangling;

/// Verdict returned by an out-of-memory handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OomAction {
    /// Memory was (probably) released; retry the system request
    Retry,
    /// Nothing more can be done; report out-of-memory to the caller
    Fail,
}

/// Out-of-memory handler
///
/// Shared so that [`RawAllocator::set_oom_handler`] can hand back the
/// previous handler while the allocator keeps invoking clones of it.
pub type OomHandler = Arc<dyn Fn() -> OomAction + Send + Sync>;

/// System-backed allocator with an out-of-memory retry loop
///
/// Every request is sized in bytes and aligned to [`ALIGN`]. Zero-byte
/// requests never reach the heap: they yield an aligned dangling pointer.
///
/// # Examples
/// ```
/// use segalloc::allocator::{ByteAllocator, RawAllocator};
///
/// let raw = RawAllocator::new();
/// let ptr = raw.allocate(256)?;
/// unsafe { raw.deallocate(ptr, 256) };
/// # Ok::<(), segalloc::MemoryError>(())
/// ```
pub struct RawAllocator<H: SystemHeap = SystemAllocator> {
    heap: H,
    oom_handler: Mutex<Option<OomHandler>>,
    oom_invocations: AtomicU64,
}

impl RawAllocator<SystemAllocator> {
    /// Creates a raw allocator over the platform allocator
    pub fn new() -> Self {
        Self::with_heap(SystemAllocator::new())
    }
}

impl Default for RawAllocator<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: SystemHeap> RawAllocator<H> {
    /// Creates a raw allocator over an arbitrary heap
    pub fn with_heap(heap: H) -> Self {
        Self {
            heap,
            oom_handler: Mutex::new(None),
            oom_invocations: AtomicU64::new(0),
        }
    }

    /// Returns the underlying heap
    pub fn heap(&self) -> &H {
        &self.heap
    }

    /// Installs `handler`, returning the previously installed one
    ///
    /// Passing `None` removes the handler, after which heap failures are
    /// reported immediately.
    pub fn set_oom_handler(&self, handler: Option<OomHandler>) -> Option<OomHandler> {
        core::mem::replace(&mut *self.oom_handler.lock(), handler)
    }

    /// Returns a clone of the installed handler, if any
    pub fn oom_handler(&self) -> Option<OomHandler> {
        self.oom_handler.lock().clone()
    }

    /// Number of times an out-of-memory handler has been invoked
    pub fn oom_invocations(&self) -> u64 {
        self.oom_invocations.load(Ordering::Relaxed)
    }

    /// Single heap request with no handler involvement
    ///
    /// Returns `None` where [`allocate`](Self::allocate) would start the
    /// retry loop.
    pub fn try_allocate(&self, bytes: usize) -> Option<NonNull<u8>> {
        if bytes == 0 {
            return Some(dangling());
        }
        let layout = Self::layout_for(bytes).ok()?;
        // SAFETY: layout has a non-zero size.
        NonNull::new(unsafe { self.heap.alloc(layout) })
    }

    /// Allocates `bytes` bytes, consulting the OOM handler on failure
    pub fn allocate(&self, bytes: usize) -> AllocResult<NonNull<u8>> {
        if bytes == 0 {
            return Ok(dangling());
        }
        let layout = Self::layout_for(bytes)?;

        loop {
            // SAFETY: layout has a non-zero size.
            if let Some(ptr) = NonNull::new(unsafe { self.heap.alloc(layout) }) {
                return Ok(ptr);
            }
            self.handle_oom(bytes)?;
        }
    }

    /// Returns memory to the heap
    ///
    /// # Safety
    /// `ptr` must come from this allocator with exactly `bytes` bytes.
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize) {
        if bytes == 0 {
            return;
        }
        // A size that cannot form a layout was never handed out.
        if let Ok(layout) = Self::layout_for(bytes) {
            // SAFETY: caller guarantees provenance and size.
            unsafe { self.heap.dealloc(ptr.as_ptr(), layout) };
        }
    }

    /// Resizes an allocation with the same retry protocol as [`allocate`](Self::allocate)
    ///
    /// # Safety
    /// `ptr` must come from this allocator with exactly `old_bytes` bytes.
    pub unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> AllocResult<NonNull<u8>> {
        if old_bytes == 0 {
            return self.allocate(new_bytes);
        }
        if new_bytes == 0 {
            // SAFETY: forwarded caller contract.
            unsafe { self.deallocate(ptr, old_bytes) };
            return Ok(dangling());
        }

        let old_layout = Self::layout_for(old_bytes)?;
        Self::layout_for(new_bytes)?;

        loop {
            // SAFETY: caller guarantees `ptr`/`old_layout`; the new size is
            // non-zero and forms a valid layout (checked above).
            let resized = unsafe { self.heap.realloc(ptr.as_ptr(), old_layout, new_bytes) };
            if let Some(new_ptr) = NonNull::new(resized) {
                return Ok(new_ptr);
            }
            self.handle_oom(new_bytes)?;
        }
    }

    fn layout_for(bytes: usize) -> AllocResult<Layout> {
        Layout::from_size_align(bytes, ALIGN)
            .map_err(|_| AllocError::invalid_layout("size exceeds isize::MAX once aligned"))
    }

    /// Runs one round of the OOM protocol
    ///
    /// The handler is cloned out of the lock before it runs, so it may
    /// install or clear handlers itself.
    fn handle_oom(&self, bytes: usize) -> AllocResult<()> {
        let Some(handler) = self.oom_handler() else {
            return Err(AllocError::out_of_memory(bytes));
        };

        self.oom_invocations.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "logging")]
        warn!(bytes, "system heap refused request, invoking oom handler");

        match handler() {
            OomAction::Retry => Ok(()),
            OomAction::Fail => Err(AllocError::out_of_memory(bytes)),
        }
    }
}

impl<H: SystemHeap + fmt::Debug> fmt::Debug for RawAllocator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAllocator")
            .field("heap", &self.heap)
            .field("has_oom_handler", &self.oom_handler.lock().is_some())
            .field("oom_invocations", &self.oom_invocations())
            .finish()
    }
}

// SAFETY: Pointers come from the heap (aligned to ALIGN by construction of
// every layout) or are dangling for zero-byte requests, which are never
// dereferenced.
unsafe impl<H: SystemHeap> ByteAllocator for RawAllocator<H> {
    #[inline]
    fn allocate(&self, bytes: usize) -> AllocResult<NonNull<u8>> {
        Self::allocate(self, bytes)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize) {
        // SAFETY: forwarded caller contract.
        unsafe { Self::deallocate(self, ptr, bytes) }
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> AllocResult<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { Self::reallocate(self, ptr, old_bytes, new_bytes) }
    }
}
