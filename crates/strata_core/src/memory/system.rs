//! # System Allocator
//!
//! Stateless adapter over the platform heap. Root allocator from which arenas
//! and pools carve their own budgets.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use super::{Allocator, MAX_ALIGN};

/// The platform heap behind the [`Allocator`] interface.
///
/// Every request is served with [`MAX_ALIGN`] alignment, the same guarantee
/// `malloc` gives, so `deallocate` only needs the size back.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

static INSTANCE: SystemAllocator = SystemAllocator;

impl SystemAllocator {
    /// Process-wide instance.
    #[inline]
    #[must_use]
    pub fn instance() -> &'static SystemAllocator {
        &INSTANCE
    }

    #[inline]
    fn layout(size: usize) -> Option<Layout> {
        // Zero-sized layouts are not allowed by the global allocator.
        Layout::from_size_align(size.max(1), MAX_ALIGN).ok()
    }
}

// SAFETY: every region is a distinct `std::alloc` allocation of at least
// `size` bytes at `MAX_ALIGN`, and requests above that alignment are refused.
unsafe impl Allocator for SystemAllocator {
    fn allocate(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        if !align.is_power_of_two() || align > MAX_ALIGN {
            return None;
        }
        let layout = Self::layout(size)?;
        // SAFETY: layout has a non-zero size.
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        if let Some(layout) = Self::layout(size) {
            // SAFETY: caller guarantees ptr came from `allocate(size, _)`, which
            // used this exact layout.
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Option<NonNull<u8>> {
        if !align.is_power_of_two() || align > MAX_ALIGN {
            return None;
        }
        let layout = Self::layout(old_size)?;
        // SAFETY: caller guarantees ptr was allocated with `layout`; the new
        // size is non-zero and rounds to a valid layout at MAX_ALIGN.
        NonNull::new(unsafe { alloc::realloc(ptr.as_ptr(), layout, new_size.max(1)) })
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_aligned() {
        let heap = SystemAllocator::instance();
        let ptr = heap.allocate(24, 8).unwrap();
        assert_eq!(ptr.as_ptr() as usize % MAX_ALIGN, 0);
        unsafe { heap.deallocate(ptr, 24) };
    }

    #[test]
    fn test_rejects_oversized_alignment() {
        let heap = SystemAllocator::instance();
        assert!(heap.allocate(64, 4096).is_none());
        assert!(heap.allocate(64, 3).is_none());
    }

    #[test]
    fn test_reallocate_preserves_prefix() {
        let heap = SystemAllocator::instance();
        let ptr = heap.allocate(4, 4).unwrap();
        unsafe {
            ptr.as_ptr().copy_from_nonoverlapping([1u8, 2, 3, 4].as_ptr(), 4);
            let grown = heap.reallocate(ptr, 4, 4096, 4).unwrap();
            let prefix = std::slice::from_raw_parts(grown.as_ptr(), 4);
            assert_eq!(prefix, &[1, 2, 3, 4]);
            heap.deallocate(grown, 4096);
        }
    }

    #[test]
    fn test_zero_sized_requests() {
        let heap = SystemAllocator::instance();
        let ptr = heap.allocate(0, 1).unwrap();
        unsafe { heap.deallocate(ptr, 0) };
    }
}
