//! Alignment helpers shared by the raw and pooled tiers

use core::ptr::NonNull;

/// Zero-sized marker carrying the pool alignment
#[repr(C, align(8))]
struct MinAligned;

/// Well-aligned dangling pointer handed out for zero-byte requests
///
/// The address equals the pool alignment, so it satisfies every block
/// alignment guarantee while never pointing at real memory.
#[inline]
pub fn dangling() -> NonNull<u8> {
    NonNull::<MinAligned>::dangling().cast()
}

/// Aligns a value up to the nearest multiple of alignment
///
/// # Examples
/// ```
/// use segalloc::utils::align_up;
///
/// assert_eq!(align_up(7, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(9, 8), 16);
/// ```
#[inline(always)]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Overflow-checked variant of [`align_up`]
///
/// # Examples
/// ```
/// use segalloc::utils::checked_align_up;
///
/// assert_eq!(checked_align_up(9, 8), Some(16));
/// assert_eq!(checked_align_up(usize::MAX, 8), None);
/// ```
#[inline]
pub const fn checked_align_up(value: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    match value.checked_add(alignment - 1) {
        Some(bumped) => Some(bumped & !(alignment - 1)),
        None => None,
    }
}

/// Checks if a value is aligned to the given alignment
///
/// # Examples
/// ```
/// use segalloc::utils::is_aligned;
///
/// assert!(is_aligned(16, 8));
/// assert!(is_aligned(0, 8));
/// assert!(!is_aligned(17, 8));
/// ```
#[inline(always)]
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    value & (alignment - 1) == 0
}

/// Check if a pointer is properly aligned
#[inline(always)]
pub fn is_aligned_ptr<T>(ptr: *const T, alignment: usize) -> bool {
    is_aligned(ptr as usize, alignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up_boundaries() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(120, 8), 120);
        assert_eq!(align_up(121, 8), 128);
    }

    #[test]
    fn test_checked_align_up_overflow() {
        assert_eq!(checked_align_up(usize::MAX - 3, 8), None);
        assert_eq!(checked_align_up(usize::MAX - 7, 8), Some(usize::MAX - 7));
    }

    #[test]
    fn test_dangling_is_aligned() {
        assert!(is_aligned_ptr(dangling().as_ptr(), 8));
    }

    #[test]
    fn test_is_aligned_ptr() {
        let value = 0u64;
        assert!(is_aligned_ptr(&raw const value, 8));
        assert!(!is_aligned_ptr(1usize as *const u8, 8));
    }
}
