//! # Dictionary
//!
//! Map from interned strings to values for sets that are built up and torn
//! down at runtime, where a fixed [`LookupTable`](crate::LookupTable) budget
//! does not fit.
//!
//! A 4-ary trie: each level consumes the top two bits of the key's hash, so
//! there is no capacity ceiling and no rehash, at the cost of one allocation
//! per entry and `O(log4 n)` depth.

use strata_core::memory::{AllocBox, Allocator};

use crate::hash::hash_bytes;
use crate::string_table::{StringHandle, StringTable};

struct Node<'a, T> {
    key: StringHandle,
    value: T,
    children: [Option<AllocBox<'a, Node<'a, T>>>; 4],
}

#[inline]
fn handle_hash(key: StringHandle) -> u64 {
    hash_bytes(&key.raw().to_le_bytes())
}

/// Child slot for the current level.
#[inline]
fn branch(hash: u64) -> usize {
    (hash >> 62) as usize
}

/// A 4-ary hash trie keyed by [`StringHandle`].
///
/// Every node is allocated from the dictionary's allocator and released
/// through it by [`clear`](Self::clear) or on drop.
pub struct Dictionary<'a, T> {
    allocator: &'a dyn Allocator,
    root: Option<AllocBox<'a, Node<'a, T>>>,
    len: usize,
}

impl<'a, T> Dictionary<'a, T> {
    /// Creates an empty dictionary. Nothing is allocated until the first insert.
    #[must_use]
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            allocator,
            root: None,
            len: 0,
        }
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there are no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `value` under `key`, replacing any previous value, and returns
    /// the stored value.
    ///
    /// # Panics
    ///
    /// Fatal if the allocator cannot provide a node.
    #[track_caller]
    pub fn insert(&mut self, key: StringHandle, value: T) -> &mut T {
        let allocator = self.allocator;
        let mut hash = handle_hash(key);
        let mut slot = &mut self.root;
        while let Some(node) = slot {
            if node.key == key {
                node.value = value;
                return &mut node.value;
            }
            slot = &mut node.children[branch(hash)];
            hash <<= 2;
        }

        self.len += 1;
        let node = slot.insert(AllocBox::new_in(
            Node {
                key,
                value,
                children: [None, None, None, None],
            },
            allocator,
        ));
        &mut node.value
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn lookup(&self, key: StringHandle) -> Option<&T> {
        let mut hash = handle_hash(key);
        let mut node = self.root.as_deref();
        while let Some(current) = node {
            if current.key == key {
                return Some(&current.value);
            }
            node = current.children[branch(hash)].as_deref();
            hash <<= 2;
        }
        None
    }

    /// Value stored under `key`, mutably.
    pub fn lookup_mut(&mut self, key: StringHandle) -> Option<&mut T> {
        let mut hash = handle_hash(key);
        let mut node = self.root.as_deref_mut();
        while let Some(current) = node {
            if current.key == key {
                return Some(&mut current.value);
            }
            node = current.children[branch(hash)].as_deref_mut();
            hash <<= 2;
        }
        None
    }

    /// Returns true if `key` has an entry.
    #[must_use]
    pub fn contains(&self, key: StringHandle) -> bool {
        self.lookup(key).is_some()
    }

    /// Releases every node through the allocator.
    pub fn clear(&mut self) {
        // Dropping the root drops each subtree before its parent node.
        self.root = None;
        self.len = 0;
    }

    /// Interns `key` in `strings` and stores `value` under it.
    ///
    /// # Panics
    ///
    /// Fatal if the string table or the allocator is exhausted.
    #[track_caller]
    pub fn insert_str(&mut self, strings: &mut StringTable, key: &str, value: T) -> &mut T {
        let handle = strings.intern(key);
        self.insert(handle, value)
    }

    /// Value stored under `key`. A string never interned is a miss.
    #[must_use]
    pub fn lookup_str(&self, strings: &StringTable, key: &str) -> Option<&T> {
        strings.handle_for(key).and_then(|handle| self.lookup(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{kilobytes, ArenaAllocator, SystemAllocator};

    #[test]
    fn test_insert_and_lookup() {
        let mut strings = StringTable::with_capacity(4096, 8);
        let mut dict = Dictionary::new(SystemAllocator::instance());
        dict.insert_str(&mut strings, "speed", 3.5f32);
        dict.insert_str(&mut strings, "gravity", -9.8);
        assert_eq!(dict.lookup_str(&strings, "speed"), Some(&3.5));
        assert_eq!(dict.lookup_str(&strings, "gravity"), Some(&-9.8));
        assert_eq!(dict.lookup_str(&strings, "friction"), None);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_insert_updates_in_place() {
        let mut strings = StringTable::with_capacity(4096, 8);
        let key = strings.intern("lives");
        let mut dict = Dictionary::new(SystemAllocator::instance());
        *dict.insert(key, 1) += 10;
        assert_eq!(dict.lookup(key), Some(&11));
        dict.insert(key, 3);
        assert_eq!(dict.lookup(key), Some(&3));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_many_keys() {
        let mut strings = StringTable::with_capacity(64 * 1024, 12);
        let mut dict = Dictionary::new(SystemAllocator::instance());
        let handles: Vec<_> = (0..2000).map(|i| strings.intern(&format!("entity_{i}"))).collect();
        for (i, &h) in handles.iter().enumerate() {
            dict.insert(h, i);
        }
        assert_eq!(dict.len(), 2000);
        for (i, &h) in handles.iter().enumerate() {
            assert_eq!(dict.lookup(h), Some(&i));
        }
        if let Some(v) = dict.lookup_mut(handles[7]) {
            *v = 70;
        }
        assert_eq!(dict.lookup(handles[7]), Some(&70));
    }

    #[test]
    fn test_lookup_str_does_not_intern() {
        let strings = StringTable::with_capacity(256, 4);
        let dict: Dictionary<u8> = Dictionary::new(SystemAllocator::instance());
        assert_eq!(dict.lookup_str(&strings, "missing"), None);
        assert!(strings.is_empty());
    }

    #[test]
    fn test_clear_releases_nodes() {
        let mut strings = StringTable::with_capacity(4096, 8);
        let arena = ArenaAllocator::new(SystemAllocator::instance(), kilobytes(16));
        let mut dict = Dictionary::new(&arena);
        // One entry: its node is the arena tip and is reclaimed on clear.
        let key = strings.intern("solo");
        dict.insert(key, 1u64);
        assert!(arena.used_bytes() > 0);
        dict.clear();
        assert_eq!(arena.used_bytes(), 0);
        assert!(dict.is_empty());
        assert!(!dict.contains(key));

        dict.insert(key, 2);
        assert_eq!(dict.lookup(key), Some(&2));
    }

    #[test]
    fn test_values_are_dropped() {
        use std::rc::Rc;

        let mut strings = StringTable::with_capacity(4096, 8);
        let shared = Rc::new(());
        {
            let mut dict = Dictionary::new(SystemAllocator::instance());
            for name in ["a", "b", "c", "d", "e"] {
                dict.insert_str(&mut strings, name, Rc::clone(&shared));
            }
            assert_eq!(Rc::strong_count(&shared), 6);
        }
        assert_eq!(Rc::strong_count(&shared), 1);
    }
}
