//! Intrusive LIFO free lists
//!
//! # Safety
//!
//! A pooled block lives in one of two phases and is typed accordingly:
//! - **free**: reachable only as `NonNull<FreeBlock>` from a [`FreeList`];
//!   its first word stores the next free block of the same class
//! - **allocated**: handed out as `NonNull<u8>`; every byte, header word
//!   included, belongs to the caller
//!
//! Conversion between the phases happens only in [`FreeList::push`] and
//! [`FreeList::pop`]. A block is never viewed both ways at once.

use core::fmt;
use core::ptr::NonNull;

use super::size_class::{NUM_FREE_LISTS, class_size};

/// Header overlaid on a free block
#[repr(C)]
pub(crate) struct FreeBlock {
    next: Option<NonNull<FreeBlock>>,
}

/// Singly linked stack of free blocks of one size class
pub(crate) struct FreeList {
    head: Option<NonNull<FreeBlock>>,
    len: usize,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Moves an allocated block into the free phase
    ///
    /// # Safety
    /// `block` must be valid for writes of at least one pointer, aligned to
    /// `ALIGN`, not already on any list, and not used by anyone else until
    /// popped again.
    pub(crate) unsafe fn push(&mut self, block: NonNull<u8>) {
        let block = block.cast::<FreeBlock>();
        // SAFETY: caller guarantees `block` is writable, aligned and exclusive.
        unsafe { block.as_ptr().write(FreeBlock { next: self.head }) };
        self.head = Some(block);
        self.len += 1;
    }

    /// Moves the head block into the allocated phase
    pub(crate) fn pop(&mut self) -> Option<NonNull<u8>> {
        let head = self.head?;
        // SAFETY: every block on the list was written by `push` or
        // `install_chain`, so its header holds a valid (or absent) successor.
        self.head = unsafe { head.as_ref().next };
        self.len -= 1;
        Some(head.cast())
    }

    /// Links `count` contiguous blocks starting at `start` in front of the list
    ///
    /// The lowest address becomes the new head; the highest block points at
    /// whatever the list held before.
    ///
    /// # Safety
    /// `start` must be valid for writes of `count * block_size` bytes, aligned
    /// to `ALIGN`, and exclusively owned by the pool.
    pub(crate) unsafe fn install_chain(&mut self, start: NonNull<u8>, block_size: usize, count: usize) {
        if count == 0 {
            return;
        }

        let mut next = self.head;
        // Link back to front so the lowest address ends up at the head.
        for i in (0..count).rev() {
            // SAFETY: `i * block_size` stays within the region the caller vouched for.
            let block = unsafe { start.add(i * block_size) }.cast::<FreeBlock>();
            // SAFETY: block is inside the exclusively owned region and aligned.
            unsafe { block.as_ptr().write(FreeBlock { next }) };
            next = Some(block);
        }

        self.head = next;
        self.len += count;
    }
}

impl fmt::Debug for FreeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeList")
            .field("head", &self.head)
            .field("len", &self.len)
            .finish()
    }
}

/// One free list per size class
pub(crate) struct FreeLists {
    lists: [FreeList; NUM_FREE_LISTS],
}

impl FreeLists {
    pub(crate) const fn new() -> Self {
        Self {
            lists: [const { FreeList::new() }; NUM_FREE_LISTS],
        }
    }

    pub(crate) fn get(&self, index: usize) -> &FreeList {
        &self.lists[index]
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut FreeList {
        &mut self.lists[index]
    }

    /// Total number of free blocks across every class
    pub(crate) fn total_blocks(&self) -> usize {
        self.lists.iter().map(FreeList::len).sum()
    }

    /// Total bytes parked on the free lists
    pub(crate) fn total_bytes(&self) -> usize {
        self.lists
            .iter()
            .enumerate()
            .map(|(index, list)| list.len() * class_size(index))
            .sum()
    }

    /// Pops the head of the first non-empty list at or above `from_index`
    ///
    /// Returns the block together with its class size.
    pub(crate) fn pop_at_or_above(&mut self, from_index: usize) -> Option<(NonNull<u8>, usize)> {
        self.lists[from_index..]
            .iter_mut()
            .enumerate()
            .find_map(|(offset, list)| list.pop().map(|block| (block, class_size(from_index + offset))))
    }
}

impl fmt::Debug for FreeLists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.lists.iter().map(FreeList::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(8))]
    struct Slab([u8; 64]);

    #[test]
    fn test_push_pop_is_lifo() {
        let mut slab = Slab([0; 64]);
        let base = NonNull::new(slab.0.as_mut_ptr()).unwrap();
        let a = base;
        let b = unsafe { base.add(8) };

        let mut list = FreeList::new();
        unsafe {
            list.push(a);
            list.push(b);
        }
        assert_eq!(list.len(), 2);
        assert_eq!(list.pop(), Some(b));
        assert_eq!(list.pop(), Some(a));
        assert_eq!(list.pop(), None);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_install_chain_links_in_address_order() {
        let mut slab = Slab([0; 64]);
        let base = NonNull::new(slab.0.as_mut_ptr()).unwrap();

        let mut list = FreeList::new();
        unsafe { list.install_chain(base, 16, 4) };
        assert_eq!(list.len(), 4);

        for i in 0..4 {
            assert_eq!(list.pop(), Some(unsafe { base.add(i * 16) }));
        }
        assert_eq!(list.pop(), None);
    }

    #[test]
    fn test_install_chain_keeps_existing_blocks() {
        let mut slab = Slab([0; 64]);
        let base = NonNull::new(slab.0.as_mut_ptr()).unwrap();

        let mut list = FreeList::new();
        unsafe {
            list.push(base.add(48));
            list.install_chain(base, 16, 2);
        }
        assert_eq!(list.len(), 3);
        assert_eq!(list.pop(), Some(base));
        assert_eq!(list.pop(), Some(unsafe { base.add(16) }));
        assert_eq!(list.pop(), Some(unsafe { base.add(48) }));
    }

    #[test]
    fn test_pop_at_or_above_skips_smaller_classes() {
        let mut slab = Slab([0; 64]);
        let base = NonNull::new(slab.0.as_mut_ptr()).unwrap();

        let mut lists = FreeLists::new();
        unsafe {
            lists.get_mut(0).push(base);
            lists.get_mut(3).push(base.add(32));
        }
        assert_eq!(lists.total_blocks(), 2);
        assert_eq!(lists.total_bytes(), 8 + 32);

        let (block, size) = lists.pop_at_or_above(1).unwrap();
        assert_eq!(block, unsafe { base.add(32) });
        assert_eq!(size, 32);
        assert!(lists.pop_at_or_above(1).is_none());
        assert_eq!(lists.get(0).len(), 1);
    }
}
