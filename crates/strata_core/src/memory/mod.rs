//! # Memory Management
//!
//! The allocator capability and its implementations.
//!
//! ## Design Philosophy
//!
//! Every subsystem receives a `&dyn Allocator` and never allocates through any
//! other path. Which strategy sits behind it is a per-subsystem decision:
//! - [`SystemAllocator`] - the platform heap, root of everything else
//! - [`ArenaAllocator`] - bump region with tip reclaim (frame, request, packing run)
//! - [`BumpAllocator`] - bump region that never reclaims (one-shot tools)
//! - [`BlockAllocator`] - fixed-size slab for high-churn uniform records
//!
//! ## Safety Note
//!
//! This module hands out raw regions and therefore requires unsafe code.
//! Region arithmetic is done on offsets and checked against the region end
//! before any pointer is formed.

#![allow(unsafe_code)]

mod arena;
mod block;
mod boxed;
mod system;
mod units;

use std::ptr::NonNull;

use crate::error::MemoryError;

pub use arena::{ArenaAllocator, BumpAllocator};
pub use block::{BlockAllocator, BlockHandle};
pub use boxed::{dup_bytes, dup_str, try_dup_bytes, AllocBox, AllocSlice};
pub use system::SystemAllocator;
pub use units::{gigabytes, kilobytes, megabytes};

/// Largest fundamental alignment (`max_align_t` on every supported target).
///
/// Bump allocators round every step to this, so any address they hand out is
/// suitable for any ordinary type.
pub const MAX_ALIGN: usize = 16;

/// Capability to produce and reclaim raw memory.
///
/// Allocation and deallocation take `&self`, so one allocator can back many
/// containers at once. [`reset`](Allocator::reset) takes `&mut self`: every
/// container borrowing the allocator must be gone before its region rewinds.
///
/// # Safety
///
/// Containers write through the returned pointers without further checks,
/// so implementors must uphold, like [`std::alloc::GlobalAlloc`]:
/// - `allocate` returns `None` or a region of at least `size` bytes, aligned
///   to `align`, that no other live allocation overlaps and that stays valid
///   until it is passed to `deallocate`, `reallocate` or `reset`;
/// - `reallocate` either returns `None` and leaves the old region untouched,
///   or returns a region meeting the `allocate` guarantees whose first
///   `min(old_size, new_size)` bytes equal the old contents;
/// - `deallocate` never invalidates a region other than the one passed in;
/// - no method unwinds while the allocator's bookkeeping is inconsistent.
pub unsafe trait Allocator {
    /// Returns at least `size` bytes aligned to `align` (a power of two), or
    /// `None` if the allocator cannot satisfy the request.
    fn allocate(&self, size: usize, align: usize) -> Option<NonNull<u8>>;

    /// Relinquishes a region previously returned by this allocator.
    ///
    /// Implementations may ignore the call.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator with exactly `size` bytes requested,
    /// and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize);

    /// Grows or shrinks a region, preserving its first `min(old_size, new_size)`
    /// bytes. May return a different address; on `None` the old region is
    /// still valid.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator with exactly `old_size` bytes
    /// requested. On success the old pointer must not be used again.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Option<NonNull<u8>>;

    /// Returns the allocator to its initial, empty state. No-op where unsupported.
    fn reset(&mut self);

    /// Bytes currently handed out, where the allocator tracks it.
    fn used_bytes(&self) -> usize {
        0
    }

    /// Total budget in bytes, or `None` when unbounded.
    fn total_bytes(&self) -> Option<usize> {
        None
    }
}

/// Returns true if two allocator references point at the same allocator.
///
/// Address and implementation must both match: a zero-sized allocator shares
/// its address with unrelated values, and a wrapper shares its address with
/// the allocator stored in its first field. A duplicated vtable can make this
/// return false for one allocator, which callers treat as "copy".
#[inline]
#[must_use]
#[allow(clippy::vtable_address_comparisons)]
pub fn same_allocator(a: &dyn Allocator, b: &dyn Allocator) -> bool {
    std::ptr::eq(a as *const dyn Allocator, b as *const dyn Allocator)
}

/// Describes why `allocator` refused a `size`-byte request.
pub(crate) fn allocation_failure(allocator: &dyn Allocator, size: usize) -> MemoryError {
    match allocator.total_bytes() {
        Some(total) => MemoryError::OutOfMemory {
            requested: size,
            remaining: total.saturating_sub(allocator.used_bytes()),
        },
        None => MemoryError::HeapFailure { size },
    }
}

/// Rounds `n` up to a multiple of `m` (a power of two).
#[inline]
#[must_use]
pub const fn align_up(n: usize, m: usize) -> usize {
    debug_assert!(m.is_power_of_two());
    (n + m - 1) & !(m - 1)
}

/// Smallest power of two `>= n` (1 for `n < 2`).
#[inline]
#[must_use]
pub const fn next_pow2(n: usize) -> usize {
    if n < 2 {
        1
    } else {
        n.next_power_of_two()
    }
}
