//! # Arena Allocator
//!
//! Bump-pointer regions for allocations that are released all at once.
//!
//! The cursor is an offset into the region, never a raw pointer: every step is
//! checked against the region end before an address is formed, so
//! `0 <= pos <= end` holds after every operation.

use std::cell::Cell;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::{align_up, Allocator, SystemAllocator, MAX_ALIGN};
use crate::error::{fatal, MemoryError, MemoryResult};

/// Offset-based bump region shared by [`ArenaAllocator`] and [`BumpAllocator`].
struct Region {
    /// First usable byte, aligned to `MAX_ALIGN`.
    begin: NonNull<u8>,
    /// Offset of the next free byte.
    pos: Cell<usize>,
    /// Usable size in bytes.
    end: usize,
}

impl Region {
    fn new(begin: NonNull<u8>, end: usize) -> Self {
        debug_assert!(end == 0 || begin.as_ptr() as usize % MAX_ALIGN == 0);
        Self {
            begin,
            pos: Cell::new(0),
            end,
        }
    }

    #[inline]
    fn addr(&self) -> usize {
        self.begin.as_ptr() as usize
    }

    /// Offset of `ptr` within the region, if it points into it (one-past-end included).
    #[inline]
    fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = (ptr.as_ptr() as usize).checked_sub(self.addr())?;
        (offset <= self.end).then_some(offset)
    }

    #[inline]
    fn at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.end);
        // SAFETY: offset is within [0, end], so the result stays inside the
        // region (or one past its end) and is non-null.
        unsafe { NonNull::new_unchecked(self.begin.as_ptr().add(offset)) }
    }

    /// Start offset for a block with the given alignment.
    #[inline]
    fn aligned_start(&self, pos: usize, align: usize) -> Option<usize> {
        if align <= MAX_ALIGN {
            return Some(pos);
        }
        let addr = self.addr().checked_add(pos)?.checked_add(align - 1)? & !(align - 1);
        Some(addr - self.addr())
    }

    fn remaining(&self) -> usize {
        self.end - self.pos.get()
    }

    fn try_bump(&self, size: usize, align: usize) -> MemoryResult<NonNull<u8>> {
        if !align.is_power_of_two() {
            return Err(MemoryError::InvalidAlignment(align));
        }
        let out_of_memory = MemoryError::OutOfMemory {
            requested: size,
            remaining: self.remaining(),
        };
        let step = size
            .checked_add(MAX_ALIGN - 1)
            .map(|s| s & !(MAX_ALIGN - 1))
            .ok_or_else(|| out_of_memory.clone())?;
        let start = self
            .aligned_start(self.pos.get(), align)
            .ok_or_else(|| out_of_memory.clone())?;
        match start.checked_add(step) {
            Some(new_pos) if new_pos <= self.end => {
                self.pos.set(new_pos);
                Ok(self.at(start))
            }
            _ => Err(out_of_memory),
        }
    }

    /// Rewinds the cursor if `ptr..ptr+size` is the most recent block.
    fn reclaim_tip(&self, ptr: NonNull<u8>, size: usize) {
        let Some(offset) = self.offset_of(ptr) else {
            return;
        };
        if offset.checked_add(align_up(size, MAX_ALIGN)) == Some(self.pos.get()) {
            self.pos.set(offset);
        }
    }

    /// # Safety
    ///
    /// `ptr` must come from this region with `old_size` bytes requested.
    unsafe fn resize(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Option<NonNull<u8>> {
        let offset = self.offset_of(ptr)?;
        let at_tip = offset.checked_add(align_up(old_size, MAX_ALIGN)) == Some(self.pos.get());
        let aligned = (ptr.as_ptr() as usize & (align.max(1) - 1)) == 0;

        if at_tip && aligned {
            let new_pos = offset.checked_add(new_size.checked_add(MAX_ALIGN - 1)? & !(MAX_ALIGN - 1))?;
            if new_pos > self.end {
                return None;
            }
            self.pos.set(new_pos);
            return Some(ptr);
        }

        tracing::warn!(
            old_size,
            new_size,
            "non-tip arena reallocation, copying block"
        );
        let fresh = self.try_bump(new_size, align).ok()?;
        // SAFETY: `fresh` was just bumped past the cursor, so it cannot overlap
        // the live block at `ptr`; both are valid for `min(old, new)` bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), old_size.min(new_size));
        }
        Some(fresh)
    }
}

/// Where an arena's buffer came from.
enum Backing<'p> {
    /// Carved from a parent allocator; returned to it on drop.
    Parent {
        parent: &'p dyn Allocator,
        size: usize,
    },
    /// Caller-supplied buffer; nothing to return.
    Borrowed,
}

/// A bump-pointer arena with tip reclaim.
///
/// Allocations are O(1) cursor bumps rounded to [`MAX_ALIGN`]. Deallocating
/// the most recent block rewinds the cursor (strict LIFO); any other
/// deallocation is silently ignored. Reallocating the most recent block grows
/// or shrinks it in place, anything else is copied.
///
/// # Thread Safety
///
/// This arena is NOT thread-safe. Use one arena per thread.
///
/// # Example
///
/// ```rust,ignore
/// let frame = ArenaAllocator::new(SystemAllocator::instance(), megabytes(32));
/// let scratch = DynArray::<u32>::new(&frame);
/// ```
pub struct ArenaAllocator<'p> {
    region: Region,
    backing: Backing<'p>,
    _buffer: PhantomData<&'p mut [u8]>,
}

impl<'p> ArenaAllocator<'p> {
    /// Carves a `size`-byte arena out of `parent`.
    ///
    /// # Panics
    ///
    /// Fatal if the parent cannot provide the buffer.
    #[must_use]
    #[track_caller]
    pub fn new(parent: &'p dyn Allocator, size: usize) -> Self {
        match Self::try_new(parent, size) {
            Ok(arena) => arena,
            Err(err) => fatal(err),
        }
    }

    /// Carves a `size`-byte arena out of `parent`, reporting failure.
    ///
    /// # Errors
    ///
    /// [`MemoryError::OutOfMemory`] if the parent cannot provide the buffer.
    pub fn try_new(parent: &'p dyn Allocator, size: usize) -> MemoryResult<Self> {
        let size = align_up(size, MAX_ALIGN);
        let begin = parent
            .allocate(size, MAX_ALIGN)
            .ok_or_else(|| super::allocation_failure(parent, size))?;
        tracing::debug!(capacity = size, "arena carved from parent");
        Ok(Self {
            region: Region::new(begin, size),
            backing: Backing::Parent { parent, size },
            _buffer: PhantomData,
        })
    }

    /// Wraps a caller-supplied buffer.
    ///
    /// The usable region starts at the first [`MAX_ALIGN`]-aligned byte.
    #[must_use]
    pub fn from_buffer(buffer: &'p mut [u8]) -> Self {
        let addr = buffer.as_mut_ptr() as usize;
        let skip = (align_up(addr, MAX_ALIGN) - addr).min(buffer.len());
        let usable = (buffer.len() - skip) & !(MAX_ALIGN - 1);
        let begin = NonNull::from(&mut buffer[skip..]).cast::<u8>();
        Self {
            region: Region::new(begin, usable),
            backing: Backing::Borrowed,
            _buffer: PhantomData,
        }
    }

    /// Bytes left before the arena is exhausted.
    #[inline]
    #[must_use]
    pub fn remaining_bytes(&self) -> usize {
        self.region.remaining()
    }

    /// Returns true if `ptr` points into this arena's region.
    #[must_use]
    pub fn contains(&self, ptr: *const u8) -> bool {
        NonNull::new(ptr.cast_mut())
            .and_then(|p| self.region.offset_of(p))
            .is_some_and(|offset| offset < self.region.end)
    }

    /// Allocates, reporting why a request failed.
    ///
    /// # Errors
    ///
    /// [`MemoryError::OutOfMemory`] when the request does not fit,
    /// [`MemoryError::InvalidAlignment`] when `align` is not a power of two.
    pub fn try_allocate(&self, size: usize, align: usize) -> MemoryResult<NonNull<u8>> {
        self.region.try_bump(size, align)
    }
}

// SAFETY: regions are carved from `[cursor, end)` and the cursor only moves
// back over the tip region being released, so live regions never overlap.
unsafe impl Allocator for ArenaAllocator<'_> {
    #[inline]
    fn allocate(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        self.region.try_bump(size, align).ok()
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        self.region.reclaim_tip(ptr, size);
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { self.region.resize(ptr, old_size, new_size, align) }
    }

    /// Rewinds the cursor to the beginning of the region.
    fn reset(&mut self) {
        tracing::debug!(used = self.region.pos.get(), "arena reset");
        self.region.pos.set(0);
    }

    fn used_bytes(&self) -> usize {
        self.region.pos.get()
    }

    fn total_bytes(&self) -> Option<usize> {
        Some(self.region.end)
    }
}

impl Drop for ArenaAllocator<'_> {
    fn drop(&mut self) {
        if let Backing::Parent { parent, size } = self.backing {
            tracing::debug!(capacity = size, "arena returned to parent");
            // SAFETY: the buffer was obtained from `parent` with exactly `size`
            // bytes in `try_new`, and no allocation can outlive `&self`.
            unsafe { parent.deallocate(self.region.begin, size) };
        }
    }
}

/// A bump allocator that never reclaims.
///
/// The degenerate arena for purely sequential, one-shot workloads: it owns a
/// heap buffer, `deallocate` is a no-op, `reallocate` always copies and only
/// [`reset`] releases memory.
///
/// [`reset`]: Allocator::reset
pub struct BumpAllocator {
    arena: ArenaAllocator<'static>,
}

impl BumpAllocator {
    /// Creates a bump allocator owning `size` bytes of heap memory.
    ///
    /// # Panics
    ///
    /// Fatal if the heap cannot provide the buffer.
    #[must_use]
    #[track_caller]
    pub fn new(size: usize) -> Self {
        Self {
            arena: ArenaAllocator::new(SystemAllocator::instance(), size),
        }
    }

    /// Bytes left before the allocator is exhausted.
    #[inline]
    #[must_use]
    pub fn remaining_bytes(&self) -> usize {
        self.arena.remaining_bytes()
    }
}

// SAFETY: allocation forwards to the owned arena and regions are never
// reclaimed before `reset`, which needs `&mut self`.
unsafe impl Allocator for BumpAllocator {
    #[inline]
    fn allocate(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        self.arena.allocate(size, align)
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _size: usize) {}

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Option<NonNull<u8>> {
        let fresh = self.arena.allocate(new_size, align)?;
        // SAFETY: `fresh` lies past the cursor, disjoint from the live block at
        // `ptr`; both are valid for `min(old, new)` bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), old_size.min(new_size));
        }
        Some(fresh)
    }

    fn reset(&mut self) {
        self.arena.reset();
    }

    fn used_bytes(&self) -> usize {
        self.arena.used_bytes()
    }

    fn total_bytes(&self) -> Option<usize> {
        self.arena.total_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(ptr: NonNull<u8>) -> usize {
        ptr.as_ptr() as usize
    }

    #[test]
    fn test_tip_reclaim_scenario() {
        let arena = ArenaAllocator::new(SystemAllocator::instance(), 64);
        let a = arena.allocate(16, 1).unwrap();
        let b = arena.allocate(16, 1).unwrap();
        assert_eq!(addr(b), addr(a) + 16);

        unsafe { arena.deallocate(b, 16) };
        let c = arena.allocate(16, 1).unwrap();
        assert_eq!(c, b);

        // Not at the tip: ignored.
        unsafe { arena.deallocate(a, 16) };
        assert_eq!(arena.used_bytes(), 32);
    }

    #[test]
    fn test_allocations_round_to_max_align() {
        let arena = ArenaAllocator::new(SystemAllocator::instance(), 256);
        let a = arena.allocate(3, 1).unwrap();
        let b = arena.allocate(5, 2).unwrap();
        assert_eq!(addr(b) - addr(a), MAX_ALIGN);
        assert_eq!(addr(a) % MAX_ALIGN, 0);
        assert_eq!(addr(b) % MAX_ALIGN, 0);
    }

    #[test]
    fn test_large_alignment_pads_start() {
        let arena = ArenaAllocator::new(SystemAllocator::instance(), 1024);
        let _ = arena.allocate(16, 1).unwrap();
        let p = arena.allocate(8, 128).unwrap();
        assert_eq!(addr(p) % 128, 0);
        assert!(arena.contains(p.as_ptr()));
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let arena = ArenaAllocator::new(SystemAllocator::instance(), 32);
        assert!(arena.allocate(32, 8).is_some());
        assert!(arena.allocate(1, 1).is_none());
        assert_eq!(
            arena.try_allocate(1, 1),
            Err(MemoryError::OutOfMemory { requested: 1, remaining: 0 })
        );
    }

    #[test]
    fn test_invalid_alignment() {
        let arena = ArenaAllocator::new(SystemAllocator::instance(), 32);
        assert_eq!(arena.try_allocate(8, 3), Err(MemoryError::InvalidAlignment(3)));
    }

    #[test]
    fn test_reallocate_grows_at_tip() {
        let arena = ArenaAllocator::new(SystemAllocator::instance(), 128);
        let p = arena.allocate(16, 8).unwrap();
        let q = unsafe { arena.reallocate(p, 16, 64, 8) }.unwrap();
        assert_eq!(p, q);
        assert_eq!(arena.used_bytes(), 64);

        let r = unsafe { arena.reallocate(q, 64, 16, 8) }.unwrap();
        assert_eq!(q, r);
        assert_eq!(arena.used_bytes(), 16);
    }

    #[test]
    fn test_reallocate_copies_off_tip() {
        let arena = ArenaAllocator::new(SystemAllocator::instance(), 128);
        let p = arena.allocate(4, 4).unwrap();
        let _blocker = arena.allocate(4, 4).unwrap();
        unsafe {
            p.as_ptr().copy_from_nonoverlapping([9u8, 8, 7, 6].as_ptr(), 4);
            let q = arena.reallocate(p, 4, 32, 4).unwrap();
            assert_ne!(p, q);
            assert_eq!(std::slice::from_raw_parts(q.as_ptr(), 4), &[9, 8, 7, 6]);
        }
    }

    #[test]
    fn test_reallocate_past_end_fails() {
        let arena = ArenaAllocator::new(SystemAllocator::instance(), 32);
        let p = arena.allocate(16, 8).unwrap();
        assert!(unsafe { arena.reallocate(p, 16, 64, 8) }.is_none());
        assert_eq!(arena.used_bytes(), 16);
    }

    #[test]
    fn test_reset() {
        let mut arena = ArenaAllocator::new(SystemAllocator::instance(), 64);
        let first = arena.allocate(48, 8).unwrap();
        arena.reset();
        assert_eq!(arena.used_bytes(), 0);
        assert_eq!(arena.allocate(48, 8).unwrap(), first);
    }

    #[test]
    fn test_nested_arena_returns_buffer() {
        let parent = ArenaAllocator::new(SystemAllocator::instance(), 256);
        {
            let child = ArenaAllocator::new(&parent, 64);
            assert!(child.allocate(64, 1).is_some());
            assert_eq!(parent.used_bytes(), 64);
        }
        // Child buffer was the parent's tip, so dropping it reclaims the space.
        assert_eq!(parent.used_bytes(), 0);
    }

    #[test]
    fn test_from_buffer() {
        let mut storage = [0u8; 100];
        let arena = ArenaAllocator::from_buffer(&mut storage);
        let total = arena.total_bytes().unwrap();
        assert!(total >= 100 - 2 * MAX_ALIGN);
        assert_eq!(total % MAX_ALIGN, 0);
        let p = arena.allocate(16, 16).unwrap();
        assert_eq!(addr(p) % MAX_ALIGN, 0);
    }

    #[test]
    fn test_bump_never_reclaims() {
        let mut bump = BumpAllocator::new(64);
        let a = bump.allocate(16, 8).unwrap();
        unsafe { bump.deallocate(a, 16) };
        let b = bump.allocate(16, 8).unwrap();
        assert_ne!(a, b);
        assert_eq!(bump.used_bytes(), 32);
        assert_eq!(bump.remaining_bytes(), 32);
        let c = unsafe { bump.reallocate(b, 16, 16, 8) }.unwrap();
        assert_ne!(b, c);
        bump.reset();
        assert_eq!(bump.used_bytes(), 0);
    }
}
