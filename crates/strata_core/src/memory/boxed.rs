//! # Typed Helpers
//!
//! Construct-in-place and destroy-and-deallocate on top of the raw
//! [`Allocator`] interface.
//!
//! Every helper checks the returned address against the type's alignment
//! before writing a typed value into it.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use super::Allocator;
use crate::error::{MemoryError, MemoryResult, OrFatal};

/// Allocates room for `count` values of `T` and verifies the alignment.
fn allocate_typed<T>(allocator: &dyn Allocator, count: usize) -> MemoryResult<NonNull<T>> {
    let size = std::mem::size_of::<T>()
        .checked_mul(count)
        .ok_or(MemoryError::CapacityExceeded { capacity: count })?;
    if size == 0 {
        return Ok(NonNull::dangling());
    }
    let align = std::mem::align_of::<T>();
    let ptr = allocator
        .allocate(size, align)
        .ok_or_else(|| super::allocation_failure(allocator, size))?;
    if ptr.as_ptr() as usize % align != 0 {
        // SAFETY: just allocated with this size and never handed out.
        unsafe { allocator.deallocate(ptr, size) };
        return Err(MemoryError::InvalidAlignment(align));
    }
    Ok(ptr.cast())
}

/// Releases storage obtained from [`allocate_typed`].
///
/// # Safety
///
/// `ptr` must come from `allocate_typed::<T>(allocator, count)`.
unsafe fn deallocate_typed<T>(allocator: &dyn Allocator, ptr: NonNull<T>, count: usize) {
    let size = std::mem::size_of::<T>() * count;
    if size != 0 {
        // SAFETY: forwarded caller contract.
        unsafe { allocator.deallocate(ptr.cast(), size) };
    }
}

/// A single value constructed in place inside an [`Allocator`].
///
/// Dropping the box destroys the value and hands the storage back to the
/// allocator (which an arena may or may not reclaim).
pub struct AllocBox<'a, T> {
    ptr: NonNull<T>,
    allocator: &'a dyn Allocator,
    _marker: PhantomData<T>,
}

impl<'a, T> AllocBox<'a, T> {
    /// Moves `value` into storage from `allocator`.
    ///
    /// # Panics
    ///
    /// Fatal if the allocator cannot provide the storage.
    #[track_caller]
    pub fn new_in(value: T, allocator: &'a dyn Allocator) -> Self {
        Self::try_new_in(value, allocator).or_fatal()
    }

    /// Moves `value` into storage from `allocator`, reporting failure.
    ///
    /// # Errors
    ///
    /// The allocator's failure, or [`MemoryError::InvalidAlignment`] if the
    /// returned address does not suit `T`.
    pub fn try_new_in(value: T, allocator: &'a dyn Allocator) -> MemoryResult<Self> {
        let ptr = allocate_typed::<T>(allocator, 1)?;
        // SAFETY: ptr is valid, aligned storage for one T.
        unsafe { ptr.as_ptr().write(value) };
        Ok(Self {
            ptr,
            allocator,
            _marker: PhantomData,
        })
    }

    /// Moves the value out and releases the storage.
    pub fn into_inner(self) -> T {
        let this = std::mem::ManuallyDrop::new(self);
        // SAFETY: the value is initialized and read exactly once; the storage
        // is released right after and `Drop` is suppressed.
        unsafe {
            let value = this.ptr.as_ptr().read();
            deallocate_typed(this.allocator, this.ptr, 1);
            value
        }
    }
}

impl<T> Deref for AllocBox<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: ptr holds an initialized T for the box's lifetime.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for AllocBox<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above; `&mut self` makes the access exclusive.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for AllocBox<'_, T> {
    fn drop(&mut self) {
        // SAFETY: the value is initialized and dropped once; storage came
        // from `allocate_typed::<T>(allocator, 1)`.
        unsafe {
            std::ptr::drop_in_place(self.ptr.as_ptr());
            deallocate_typed(self.allocator, self.ptr, 1);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AllocBox<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// An array constructed in place inside an [`Allocator`].
pub struct AllocSlice<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    allocator: &'a dyn Allocator,
    _marker: PhantomData<T>,
}

impl<'a, T> AllocSlice<'a, T> {
    /// Builds `len` values with `f(index)`.
    ///
    /// # Panics
    ///
    /// Fatal if the allocator cannot provide the storage.
    #[track_caller]
    pub fn from_fn(len: usize, f: impl FnMut(usize) -> T, allocator: &'a dyn Allocator) -> Self {
        Self::try_from_fn(len, f, allocator).or_fatal()
    }

    /// Builds `len` values with `f(index)`, reporting failure.
    ///
    /// If `f` panics, the values written so far are leaked, never read.
    ///
    /// # Errors
    ///
    /// The allocator's failure.
    pub fn try_from_fn(
        len: usize,
        mut f: impl FnMut(usize) -> T,
        allocator: &'a dyn Allocator,
    ) -> MemoryResult<Self> {
        let ptr = allocate_typed::<T>(allocator, len)?;
        for index in 0..len {
            // SAFETY: index < len and the storage holds len values.
            unsafe { ptr.as_ptr().add(index).write(f(index)) };
        }
        Ok(Self {
            ptr,
            len,
            allocator,
            _marker: PhantomData,
        })
    }

    /// Builds `len` copies of `value`.
    ///
    /// # Panics
    ///
    /// Fatal if the allocator cannot provide the storage.
    #[track_caller]
    pub fn filled(len: usize, value: T, allocator: &'a dyn Allocator) -> Self
    where
        T: Clone,
    {
        Self::from_fn(len, |_| value.clone(), allocator)
    }
}

impl<T> Deref for AllocSlice<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: ptr holds len initialized values.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> DerefMut for AllocSlice<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as above, exclusively borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> Drop for AllocSlice<'_, T> {
    fn drop(&mut self) {
        // SAFETY: all len values are initialized and dropped once; storage
        // came from `allocate_typed::<T>(allocator, len)`.
        unsafe {
            std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len));
            deallocate_typed(self.allocator, self.ptr, self.len);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AllocSlice<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Copies `bytes` into `allocator`.
///
/// The copy lives as long as the allocator borrow: an arena can only be reset
/// once every such copy is gone. Copies in the system heap are never freed.
///
/// # Errors
///
/// The allocator's failure.
pub fn try_dup_bytes<'a>(allocator: &'a dyn Allocator, bytes: &[u8]) -> MemoryResult<&'a [u8]> {
    if bytes.is_empty() {
        return Ok(&[]);
    }
    let ptr = allocator
        .allocate(bytes.len(), 1)
        .ok_or_else(|| super::allocation_failure(allocator, bytes.len()))?;
    // SAFETY: ptr is fresh storage for bytes.len() bytes, disjoint from `bytes`.
    // It is never deallocated through this path and `reset` needs `&mut`, so it
    // stays valid for 'a.
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
        Ok(std::slice::from_raw_parts(ptr.as_ptr(), bytes.len()))
    }
}

/// Copies `bytes` into `allocator`.
///
/// # Panics
///
/// Fatal if the allocator cannot provide the storage.
#[track_caller]
pub fn dup_bytes<'a>(allocator: &'a dyn Allocator, bytes: &[u8]) -> &'a [u8] {
    try_dup_bytes(allocator, bytes).or_fatal()
}

/// Copies a string into `allocator`.
///
/// # Panics
///
/// Fatal if the allocator cannot provide the storage.
#[track_caller]
pub fn dup_str<'a>(allocator: &'a dyn Allocator, s: &str) -> &'a str {
    let bytes = dup_bytes(allocator, s.as_bytes());
    // SAFETY: a byte-exact copy of a valid str.
    unsafe { std::str::from_utf8_unchecked(bytes) }
}
