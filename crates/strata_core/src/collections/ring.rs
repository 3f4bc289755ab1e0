//! # Fixed Ring
//!
//! Power-of-two circular buffer for small `Copy` records.

use super::FixedArray;
use crate::memory::Allocator;

/// A circular buffer that evicts its oldest element when full.
///
/// Order is strict insertion order: nothing is ever promoted.
pub struct FixedRing<'a, T: Copy> {
    slots: FixedArray<'a, T>,
    /// Index of the oldest element.
    head: usize,
    len: usize,
    mask: usize,
}

impl<'a, T: Copy> FixedRing<'a, T> {
    /// Creates an empty ring holding up to `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two; fatal if the allocator
    /// cannot provide the storage.
    #[must_use]
    #[track_caller]
    pub fn new(capacity: usize, allocator: &'a dyn Allocator) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "ring capacity {capacity} is not a power of two"
        );
        Self {
            slots: FixedArray::new(capacity, allocator),
            head: 0,
            len: 0,
            mask: capacity - 1,
        }
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
        self.mask + 1
    }

    /// Returns true if the next push evicts the oldest element.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == self.mask + 1
    }

    /// Appends `value`, returning the evicted oldest element if the ring was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.is_full() {
            let evicted = std::mem::replace(&mut self.slots[self.head], value);
            self.head = (self.head + 1) & self.mask;
            return Some(evicted);
        }
        let tail = (self.head + self.len) & self.mask;
        if tail == self.slots.len() {
            // Slots are first filled in order; afterwards they are reused.
            self.slots.push(value);
        } else {
            self.slots[tail] = value;
        }
        self.len += 1;
        None
    }

    /// Removes and returns the oldest element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.head];
        self.head = (self.head + 1) & self.mask;
        self.len -= 1;
        Some(value)
    }

    /// Oldest element.
    #[must_use]
    pub fn front(&self) -> Option<T> {
        self.get(0)
    }

    /// Newest element.
    #[must_use]
    pub fn back(&self) -> Option<T> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    /// The `index`-th element counting from the oldest.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        (index < self.len).then(|| self.slots[(self.head + index) & self.mask])
    }

    /// Forgets every element.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.slots.clear();
    }

    /// Elements from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).map(move |i| self.slots[(self.head + i) & self.mask])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SystemAllocator;

    #[test]
    fn test_push_pop_in_order() {
        let mut ring = FixedRing::new(4, SystemAllocator::instance());
        assert_eq!(ring.push(1), None);
        assert_eq!(ring.push(2), None);
        assert_eq!(ring.pop(), Some(1));
        assert_eq!(ring.push(3), None);
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_full_ring_evicts_oldest() {
        let mut ring = FixedRing::new(4, SystemAllocator::instance());
        for i in 0..4 {
            assert_eq!(ring.push(i), None);
        }
        assert!(ring.is_full());
        assert_eq!(ring.push(4), Some(0));
        assert_eq!(ring.push(5), Some(1));
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
        assert_eq!(ring.front(), Some(2));
        assert_eq!(ring.back(), Some(5));
        assert_eq!(ring.get(4), None);
    }

    #[test]
    fn test_wraparound_after_pops() {
        let mut ring = FixedRing::new(2, SystemAllocator::instance());
        for i in 0..10 {
            ring.push(i);
            if i % 2 == 1 {
                assert_eq!(ring.pop(), Some(i - 1));
            }
        }
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.front(), Some(9));
    }

    #[test]
    #[should_panic(expected = "not a power of two")]
    fn test_capacity_must_be_power_of_two() {
        let _ = FixedRing::<u8>::new(3, SystemAllocator::instance());
    }
}
