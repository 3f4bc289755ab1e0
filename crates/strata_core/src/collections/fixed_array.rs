//! # Fixed Array
//!
//! Fixed-capacity sequence. Storage is allocated once and never moves.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::{fatal, MemoryError, MemoryResult, OrFatal};
use crate::memory::Allocator;

/// A sequence whose capacity is decided at construction.
///
/// Pushing past capacity is a contract violation and is fatal. Because the
/// buffer never reallocates, references obtained from the array stay valid
/// for its whole lifetime.
///
/// # Example
///
/// ```rust,ignore
/// let mut ids = FixedArray::new(3, SystemAllocator::instance());
/// ids.push(1);
/// ids.push(2);
/// assert_eq!(ids[1], 2);
/// ```
pub struct FixedArray<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    capacity: usize,
    allocator: &'a dyn Allocator,
    _marker: PhantomData<T>,
}

impl<'a, T> FixedArray<'a, T> {
    /// Creates an empty array with room for `capacity` elements.
    ///
    /// # Panics
    ///
    /// Fatal if the allocator cannot provide the storage.
    #[must_use]
    #[track_caller]
    pub fn new(capacity: usize, allocator: &'a dyn Allocator) -> Self {
        Self::try_new(capacity, allocator).or_fatal()
    }

    /// Creates an empty array, reporting allocation failure.
    ///
    /// # Errors
    ///
    /// The allocator's failure.
    pub fn try_new(capacity: usize, allocator: &'a dyn Allocator) -> MemoryResult<Self> {
        let size = std::mem::size_of::<T>()
            .checked_mul(capacity)
            .ok_or(MemoryError::CapacityExceeded { capacity })?;
        let ptr = if size == 0 {
            NonNull::dangling()
        } else {
            let align = std::mem::align_of::<T>();
            let raw = allocator
                .allocate(size, align)
                .ok_or_else(|| crate::memory::allocation_failure(allocator, size))?;
            if raw.as_ptr() as usize % align != 0 {
                // SAFETY: fresh allocation of `size` bytes, never handed out.
                unsafe { allocator.deallocate(raw, size) };
                return Err(MemoryError::InvalidAlignment(align));
            }
            raw.cast()
        };
        Ok(Self {
            ptr,
            len: 0,
            capacity,
            allocator,
            _marker: PhantomData,
        })
    }

    /// Creates an array filled to capacity with copies of `value`.
    ///
    /// # Panics
    ///
    /// Fatal if the allocator cannot provide the storage.
    #[must_use]
    #[track_caller]
    pub fn filled(capacity: usize, value: T, allocator: &'a dyn Allocator) -> Self
    where
        T: Clone,
    {
        let mut array = Self::new(capacity, allocator);
        for _ in 0..capacity {
            array.push(value.clone());
        }
        array
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

    /// Maximum number of elements.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free element slots.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    /// Returns true if no further element fits.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Bytes occupied by the elements.
    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    /// Appends an element, handing it back if the array is full.
    ///
    /// # Errors
    ///
    /// Returns the value when there is no room left.
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        if self.len == self.capacity {
            return Err(value);
        }
        // SAFETY: len < capacity, so the slot is inside the buffer and
        // uninitialized.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Appends an element.
    ///
    /// # Panics
    ///
    /// Fatal when the array is full.
    #[track_caller]
    pub fn push(&mut self, value: T) {
        if self.try_push(value).is_err() {
            fatal(MemoryError::CapacityExceeded { capacity: self.capacity });
        }
    }

    /// Removes the last element. Storage is kept.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the slot at the old last index is initialized and is now
        // outside `[0, len)`, so it is read exactly once.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Drops every element. Storage is kept.
    pub fn clear(&mut self) {
        let len = self.len;
        self.len = 0;
        // SAFETY: the first `len` slots were initialized; len is reset first
        // so a panicking destructor cannot cause a double drop.
        unsafe {
            std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), len));
        }
    }

    /// Last element.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// The elements as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[0, len)` is initialized.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: `[0, len)` is initialized and exclusively borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy> FixedArray<'_, T> {
    /// Appends every element of `values`, or nothing if they do not all fit.
    ///
    /// # Errors
    ///
    /// [`MemoryError::CapacityExceeded`] when `values` does not fit.
    pub fn try_extend_from_slice(&mut self, values: &[T]) -> MemoryResult<()> {
        if values.len() > self.remaining() {
            return Err(MemoryError::CapacityExceeded { capacity: self.capacity });
        }
        // SAFETY: there is room for values.len() elements after len, and the
        // source cannot alias the uninitialized tail.
        unsafe {
            std::ptr::copy_nonoverlapping(values.as_ptr(), self.ptr.as_ptr().add(self.len), values.len());
        }
        self.len += values.len();
        Ok(())
    }
}

impl<T> Deref for FixedArray<'_, T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for FixedArray<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'s, T> IntoIterator for &'s FixedArray<'_, T> {
    type Item = &'s T;
    type IntoIter = std::slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<T> Drop for FixedArray<'_, T> {
    fn drop(&mut self) {
        self.clear();
        let size = self.capacity * std::mem::size_of::<T>();
        if size != 0 {
            // SAFETY: the buffer came from `allocator` with exactly `size` bytes.
            unsafe { self.allocator.deallocate(self.ptr.cast(), size) };
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FixedArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
