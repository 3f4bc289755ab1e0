//! # Lookup Table
//!
//! Insert-once map from byte-string keys to small `Copy` values, sized at
//! construction for a known, bounded workload (scancode names, asset indices).
//!
//! ## Layout
//!
//! Three parallel slot arrays (key offset, key length, value) of `2^LOG_SIZE`
//! entries, plus a key arena holding a private copy of every inserted key so
//! callers may pass transient views.

use strata_core::error::{MemoryError, MemoryResult, OrFatal};
use strata_core::memory::{AllocSlice, Allocator};
use strata_core::FixedArray;

use crate::hash::{hash_bytes, MsiProbe};

/// Default size of the key arena in bytes.
pub const KEY_BYTES: usize = 1 << 15;

/// Key length marking an unused slot. Zero-length keys stay legal.
const EMPTY: u32 = u32::MAX;

/// Where a probe for a key ended.
enum Probe {
    /// The key lives in this slot.
    Hit(usize),
    /// The key is absent; this is the first free slot on its sequence.
    Vacant(usize),
    /// The key is absent and every slot is taken.
    Full,
}

/// Fixed-capacity open-addressing map with MSI probing.
///
/// Never grows or rehashes: running out of slots or key bytes is a sizing bug
/// and fatal for [`insert`](Self::insert). Inserting an existing key updates
/// its value in place.
///
/// # Example
///
/// ```rust,ignore
/// let mut scancodes: LookupTable<u16> = LookupTable::new(SystemAllocator::instance());
/// scancodes.insert(b"space", 0x39);
/// assert_eq!(scancodes.lookup(b"space"), Some(0x39));
/// ```
pub struct LookupTable<'a, T: Copy + Default, const LOG_SIZE: u32 = 10> {
    key_offsets: AllocSlice<'a, u32>,
    key_lengths: AllocSlice<'a, u32>,
    values: AllocSlice<'a, T>,
    keys: FixedArray<'a, u8>,
    len: usize,
    occupancy_reported: bool,
}

impl<'a, T: Copy + Default, const LOG_SIZE: u32> LookupTable<'a, T, LOG_SIZE> {
    /// Number of slots.
    pub const SLOTS: usize = 1 << LOG_SIZE;

    /// Creates an empty table with a [`KEY_BYTES`] key arena.
    ///
    /// # Panics
    ///
    /// Fatal if `parent` cannot provide the storage.
    #[must_use]
    #[track_caller]
    pub fn new(parent: &'a dyn Allocator) -> Self {
        Self::try_with_key_capacity(parent, KEY_BYTES).or_fatal()
    }

    /// Creates an empty table with a key arena of `key_bytes` bytes.
    ///
    /// # Panics
    ///
    /// Fatal if `parent` cannot provide the storage.
    #[must_use]
    #[track_caller]
    pub fn with_key_capacity(parent: &'a dyn Allocator, key_bytes: usize) -> Self {
        Self::try_with_key_capacity(parent, key_bytes).or_fatal()
    }

    /// Creates an empty table, reporting allocation failure.
    ///
    /// # Errors
    ///
    /// [`MemoryError::CapacityExceeded`] if `LOG_SIZE` is outside `1..=31` or
    /// `key_bytes` does not fit a 32-bit offset; otherwise the parent's failure.
    pub fn try_with_key_capacity(parent: &'a dyn Allocator, key_bytes: usize) -> MemoryResult<Self> {
        if !(1..=31).contains(&LOG_SIZE) {
            return Err(MemoryError::CapacityExceeded { capacity: 1 << 31 });
        }
        if key_bytes >= EMPTY as usize {
            return Err(MemoryError::CapacityExceeded { capacity: EMPTY as usize - 1 });
        }
        Ok(Self {
            key_offsets: AllocSlice::try_from_fn(Self::SLOTS, |_| 0, parent)?,
            key_lengths: AllocSlice::try_from_fn(Self::SLOTS, |_| EMPTY, parent)?,
            values: AllocSlice::try_from_fn(Self::SLOTS, |_| T::default(), parent)?,
            keys: FixedArray::try_new(key_bytes, parent)?,
            len: 0,
            occupancy_reported: false,
        })
    }

    /// Number of stored keys.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no key was inserted.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots (`2^LOG_SIZE`).
    #[inline]
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        Self::SLOTS
    }

    /// Bytes of the key arena in use.
    #[inline]
    #[must_use]
    pub fn key_bytes_used(&self) -> usize {
        self.keys.len()
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn lookup(&self, key: &[u8]) -> Option<T> {
        match self.probe(key) {
            Probe::Hit(slot) => Some(self.values[slot]),
            Probe::Vacant(_) | Probe::Full => None,
        }
    }

    /// Value stored under `key`, for keys that must have been registered.
    ///
    /// # Panics
    ///
    /// Panics if the key is absent.
    #[must_use]
    #[track_caller]
    pub fn lookup_or_die(&self, key: &[u8]) -> T {
        match self.lookup(key) {
            Some(value) => value,
            None => {
                tracing::error!(key = %String::from_utf8_lossy(key), "required key missing");
                panic!("lookup table has no key {:?}", String::from_utf8_lossy(key));
            }
        }
    }

    /// Returns true if `key` is stored.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        matches!(self.probe(key), Probe::Hit(_))
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Panics
    ///
    /// Fatal if the table or the key arena is full.
    #[track_caller]
    pub fn insert(&mut self, key: &[u8], value: T) {
        self.try_insert(key, value).or_fatal();
    }

    /// Stores `value` under `key`, reporting exhaustion.
    ///
    /// # Errors
    ///
    /// [`MemoryError::TableFull`] when no slot is free,
    /// [`MemoryError::KeyStorageExhausted`] when the key bytes do not fit.
    pub fn try_insert(&mut self, key: &[u8], value: T) -> MemoryResult<()> {
        let slot = match self.probe(key) {
            Probe::Hit(slot) => {
                self.values[slot] = value;
                return Ok(());
            }
            Probe::Vacant(slot) => slot,
            Probe::Full => return Err(MemoryError::TableFull { slots: Self::SLOTS }),
        };

        let offset = self.keys.len();
        self.keys
            .try_extend_from_slice(key)
            .map_err(|_| MemoryError::KeyStorageExhausted {
                requested: key.len(),
                remaining: self.keys.remaining(),
            })?;

        // The key arena is capped below u32::MAX at construction.
        self.key_offsets[slot] = offset as u32;
        self.key_lengths[slot] = key.len() as u32;
        self.values[slot] = value;
        self.len += 1;

        if !self.occupancy_reported && self.len * 4 > Self::SLOTS * 3 {
            self.occupancy_reported = true;
            tracing::debug!(len = self.len, slots = Self::SLOTS, "lookup table above 75% occupancy");
        }
        Ok(())
    }

    /// Stored `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], T)> + '_ {
        (0..Self::SLOTS)
            .filter(move |&slot| self.key_lengths[slot] != EMPTY)
            .map(move |slot| (self.key_at(slot), self.values[slot]))
    }

    fn key_at(&self, slot: usize) -> &[u8] {
        let start = self.key_offsets[slot] as usize;
        &self.keys[start..start + self.key_lengths[slot] as usize]
    }

    fn probe(&self, key: &[u8]) -> Probe {
        for slot in MsiProbe::new(hash_bytes(key), LOG_SIZE) {
            if self.key_lengths[slot] == EMPTY {
                return Probe::Vacant(slot);
            }
            if self.key_at(slot) == key {
                return Probe::Hit(slot);
            }
        }
        Probe::Full
    }
}
