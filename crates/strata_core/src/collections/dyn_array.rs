//! # Dynamic Array
//!
//! Growable sequence over any allocator, doubling on overflow.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::{fatal, MemoryError};
use crate::memory::{next_pow2, same_allocator, Allocator};

/// Capacity of the first buffer.
const INITIAL_CAPACITY: usize = 16;

/// A growable sequence that allocates only through its [`Allocator`].
///
/// The first insert allocates [`INITIAL_CAPACITY`] elements; every overflow
/// doubles the capacity through [`Allocator::reallocate`], so an arena whose
/// tip is this buffer grows it in place. Capacity is always a power of two.
///
/// Failure to grow is fatal.
pub struct DynArray<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    capacity: usize,
    allocator: &'a dyn Allocator,
    _marker: PhantomData<T>,
}

impl<'a, T> DynArray<'a, T> {
    const IS_ZST: bool = std::mem::size_of::<T>() == 0;

    /// Creates an empty array. Nothing is allocated until the first insert.
    #[must_use]
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            capacity: if Self::IS_ZST { usize::MAX } else { 0 },
            allocator,
            _marker: PhantomData,
        }
    }

    /// Creates an empty array with room for at least `capacity` elements.
    #[must_use]
    #[track_caller]
    pub fn with_capacity(capacity: usize, allocator: &'a dyn Allocator) -> Self {
        let mut array = Self::new(allocator);
        array.reserve(capacity);
        array
    }

    /// The allocator backing this array.
    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &'a dyn Allocator {
        self.allocator
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there are no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements that fit before the next growth.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes occupied by the elements.
    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    /// Ensures room for at least `capacity` elements, growing to
    /// `next_pow2(capacity)`.
    ///
    /// # Panics
    ///
    /// Fatal if the allocator cannot grow the buffer.
    #[track_caller]
    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.capacity {
            self.grow_to(next_pow2(capacity));
        }
    }

    /// Appends an element, doubling the buffer when full.
    ///
    /// # Panics
    ///
    /// Fatal if the allocator cannot grow the buffer.
    #[track_caller]
    pub fn push(&mut self, value: T) {
        if self.len == self.capacity {
            let next = if self.capacity == 0 {
                INITIAL_CAPACITY
            } else {
                self.capacity * 2
            };
            self.grow_to(next);
        }
        // SAFETY: len < capacity, the slot is inside the buffer and uninitialized.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    /// Removes the last element. Storage is kept.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the old last slot is initialized and now outside `[0, len)`.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Drops elements past `len`. Storage is kept.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = self.len - len;
        self.len = len;
        // SAFETY: `[len, len + tail)` was initialized and is now outside the
        // live prefix, so it is dropped exactly once.
        unsafe {
            std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr().add(len),
                tail,
            ));
        }
    }

    /// Drops every element. Storage is kept.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Drops every element and returns the buffer to the allocator.
    pub fn release(&mut self) {
        self.clear();
        self.free_buffer();
    }

    /// Resizes to `len` elements, filling with copies of `value`.
    ///
    /// # Panics
    ///
    /// Fatal if the allocator cannot grow the buffer.
    #[track_caller]
    pub fn resize(&mut self, len: usize, value: T)
    where
        T: Clone,
    {
        if len <= self.len {
            self.truncate(len);
            return;
        }
        self.reserve(len);
        while self.len < len {
            self.push(value.clone());
        }
    }

    /// Appends clones of every element of `values`.
    ///
    /// # Panics
    ///
    /// Fatal if the allocator cannot grow the buffer.
    #[track_caller]
    pub fn extend_from_slice(&mut self, values: &[T])
    where
        T: Clone,
    {
        self.reserve(self.len + values.len());
        for value in values {
            self.push(value.clone());
        }
    }

    /// Last element.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Last element, mutably.
    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().last_mut()
    }

    /// The elements as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[0, len)` is initialized; ptr is dangling-but-aligned when empty.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, exclusively borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Moves the array onto `target`.
    ///
    /// When `target` is the allocator already backing the array the buffer is
    /// handed over untouched. Otherwise the elements are copied into a new
    /// buffer from `target` and the old buffer is released to its allocator.
    #[must_use]
    #[track_caller]
    pub fn relocate<'b>(self, target: &'b dyn Allocator) -> DynArray<'b, T> {
        let mut source = std::mem::ManuallyDrop::new(self);

        if same_allocator(source.allocator, target) {
            return DynArray {
                ptr: source.ptr,
                len: source.len,
                capacity: source.capacity,
                allocator: target,
                _marker: PhantomData,
            };
        }

        let mut moved = DynArray::new(target);
        moved.reserve(source.len.max(1));
        // SAFETY: `moved` has room for `len` elements in a different buffer;
        // the elements are moved bitwise and the source forgets them by
        // setting its len to zero before its buffer is freed.
        unsafe {
            std::ptr::copy_nonoverlapping(source.ptr.as_ptr(), moved.ptr.as_ptr(), source.len);
        }
        moved.len = source.len;
        source.len = 0;
        source.free_buffer();
        moved
    }

    #[track_caller]
    fn grow_to(&mut self, capacity: usize) {
        if Self::IS_ZST {
            return;
        }
        let elem = std::mem::size_of::<T>();
        let align = std::mem::align_of::<T>();
        let Some(new_size) = elem.checked_mul(capacity) else {
            fatal(MemoryError::CapacityExceeded { capacity: self.capacity });
        };

        let raw = if self.capacity == 0 {
            self.allocator.allocate(new_size, align)
        } else {
            // SAFETY: the buffer came from this allocator with exactly
            // `capacity * elem` bytes.
            unsafe {
                self.allocator
                    .reallocate(self.ptr.cast(), self.capacity * elem, new_size, align)
            }
        };
        let Some(raw) = raw else {
            fatal(crate::memory::allocation_failure(self.allocator, new_size));
        };
        if raw.as_ptr() as usize % align != 0 {
            fatal(MemoryError::InvalidAlignment(align));
        }

        tracing::trace!(from = self.capacity, to = capacity, "dyn array grown");
        self.ptr = raw.cast();
        self.capacity = capacity;
    }

    fn free_buffer(&mut self) {
        if Self::IS_ZST || self.capacity == 0 {
            return;
        }
        // SAFETY: the buffer came from this allocator with exactly this size.
        unsafe {
            self.allocator
                .deallocate(self.ptr.cast(), self.capacity * std::mem::size_of::<T>());
        }
        self.ptr = NonNull::dangling();
        self.capacity = 0;
    }
}

impl<T> Extend<T> for DynArray<'_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(self.len + iter.size_hint().0);
        for value in iter {
            self.push(value);
        }
    }
}

impl<T> Deref for DynArray<'_, T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for DynArray<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'s, T> IntoIterator for &'s DynArray<'_, T> {
    type Item = &'s T;
    type IntoIter = std::slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<T> Drop for DynArray<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: fmt::Debug> fmt::Debug for DynArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
