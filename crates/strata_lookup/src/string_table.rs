//! # String Table
//!
//! Interning of engine-wide names (asset paths, script identifiers) into one
//! fixed byte buffer. A string is stored once and referred to by a 32-bit
//! [`StringHandle`].
//!
//! The index uses the same MSI probing as [`LookupTable`](crate::LookupTable),
//! mapping a string's hash to its offset and length in the buffer. The
//! handle is the slot index, so resolving a handle is two array reads.
//!
//! ## Safety Note
//!
//! The buffer and slot arrays are carved from [`SystemAllocator`] like every
//! other container, so this module needs unsafe code in two places: marking
//! the table `Send` and viewing stored bytes as `str`.

#![allow(unsafe_code)]

use strata_core::error::{MemoryError, MemoryResult, OrFatal};
use strata_core::memory::{AllocSlice, SystemAllocator};
use strata_core::FixedArray;

use crate::hash::{hash_bytes, MsiProbe};

/// Default byte budget (16 MiB).
pub const DEFAULT_BYTE_CAPACITY: usize = 1 << 24;

/// Default slot count exponent (65 536 slots).
pub const DEFAULT_SLOT_LOG2: u32 = 16;

/// Slot length marking an unused slot.
const EMPTY: u32 = u32::MAX;

/// Handle to an interned string.
///
/// Only meaningful for the table that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringHandle(u32);

impl StringHandle {
    /// The raw slot index.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    const fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Occupancy counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringTableStats {
    /// Distinct strings interned.
    pub strings_used: usize,
    /// Bytes of string data stored.
    pub space_used: usize,
    /// Byte budget of the buffer.
    pub total_space: usize,
    /// Number of slots.
    pub total_strings: usize,
}

/// Fixed-budget string interner.
///
/// [`intern`](Self::intern) is idempotent: byte-identical input always
/// yields the same handle, and [`lookup`](Self::lookup) of that handle is
/// byte-identical to the input. Storage never shrinks.
///
/// # Thread Safety
///
/// Interning needs `&mut self`. Share one table between threads through
/// [`MemoryContext`](crate::MemoryContext), which wraps it in a mutex.
///
/// # Example
///
/// ```rust,ignore
/// let mut strings = StringTable::new();
/// let main = strings.intern("main.lua");
/// assert_eq!(strings.intern("main.lua"), main);
/// assert_eq!(strings.lookup(main), "main.lua");
/// ```
pub struct StringTable {
    buffer: FixedArray<'static, u8>,
    offsets: AllocSlice<'static, u32>,
    lengths: AllocSlice<'static, u32>,
    slot_log2: u32,
    strings_used: usize,
    occupancy_reported: bool,
}

impl StringTable {
    /// Creates a table with the default budgets.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BYTE_CAPACITY, DEFAULT_SLOT_LOG2)
    }

    /// Creates a table storing up to `byte_capacity` bytes in `2^slot_log2` slots.
    ///
    /// # Panics
    ///
    /// Panics if `slot_log2` is outside `1..=31` or `byte_capacity` does not
    /// fit a 32-bit offset; fatal if the heap cannot provide the storage.
    #[must_use]
    #[track_caller]
    pub fn with_capacity(byte_capacity: usize, slot_log2: u32) -> Self {
        assert!(
            (1..=31).contains(&slot_log2),
            "string table slot exponent {slot_log2} outside 1..=31"
        );
        assert!(
            byte_capacity < EMPTY as usize,
            "string table byte capacity {byte_capacity} exceeds 32-bit offsets"
        );
        let slots = 1usize << slot_log2;
        tracing::debug!(byte_capacity, slots, "string table created");
        let heap = SystemAllocator::instance();
        Self {
            buffer: FixedArray::new(byte_capacity, heap),
            offsets: AllocSlice::filled(slots, 0, heap),
            lengths: AllocSlice::filled(slots, EMPTY, heap),
            slot_log2,
            strings_used: 0,
            occupancy_reported: false,
        }
    }

    /// Interns `s`, returning its handle.
    ///
    /// # Panics
    ///
    /// Fatal if the buffer or the slot index is full.
    #[track_caller]
    pub fn intern(&mut self, s: &str) -> StringHandle {
        self.try_intern(s).or_fatal()
    }

    /// Interns `s`, reporting exhaustion.
    ///
    /// # Errors
    ///
    /// [`MemoryError::StringStorageExhausted`] when the bytes do not fit,
    /// [`MemoryError::TableFull`] when no slot is free.
    pub fn try_intern(&mut self, s: &str) -> MemoryResult<StringHandle> {
        let slot = match self.find(s) {
            Ok(handle) => return Ok(handle),
            Err(Some(slot)) => slot,
            Err(None) => {
                return Err(MemoryError::TableFull {
                    slots: self.lengths.len(),
                })
            }
        };

        let offset = self.buffer.len();
        self.buffer
            .try_extend_from_slice(s.as_bytes())
            .map_err(|_| MemoryError::StringStorageExhausted {
                requested: s.len(),
                remaining: self.buffer.remaining(),
            })?;

        // Both values are below the byte capacity, itself below u32::MAX.
        self.offsets[slot] = offset as u32;
        self.lengths[slot] = s.len() as u32;
        self.strings_used += 1;

        if !self.occupancy_reported && self.strings_used * 4 > self.lengths.len() * 3 {
            self.occupancy_reported = true;
            tracing::debug!(
                strings = self.strings_used,
                slots = self.lengths.len(),
                "string table above 75% occupancy"
            );
        }
        Ok(StringHandle(slot as u32))
    }

    /// Handle of `s` if it was interned, without interning it.
    #[must_use]
    pub fn handle_for(&self, s: &str) -> Option<StringHandle> {
        self.find(s).ok()
    }

    /// The string behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not name an interned string of this table.
    #[must_use]
    #[track_caller]
    pub fn lookup(&self, handle: StringHandle) -> &str {
        match self.get(handle) {
            Some(s) => s,
            None => panic!("unknown string handle {}", handle.0),
        }
    }

    /// The string behind `handle`, if it names an interned string.
    #[must_use]
    pub fn get(&self, handle: StringHandle) -> Option<&str> {
        let slot = handle.slot();
        let len = *self.lengths.get(slot)?;
        if len == EMPTY {
            return None;
        }
        let start = self.offsets[slot] as usize;
        let bytes = &self.buffer[start..start + len as usize];
        // SAFETY: every slot records the exact byte range of a `&str` copied
        // in whole by `try_intern`, so the range is valid UTF-8.
        Some(unsafe { std::str::from_utf8_unchecked(bytes) })
    }

    /// Number of interned strings.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.strings_used
    }

    /// Returns true if nothing was interned.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.strings_used == 0
    }

    /// Current occupancy.
    #[must_use]
    pub fn stats(&self) -> StringTableStats {
        StringTableStats {
            strings_used: self.strings_used,
            space_used: self.buffer.len(),
            total_space: self.buffer.capacity(),
            total_strings: self.lengths.len(),
        }
    }

    /// `Ok(handle)` on a hit, `Err(Some(slot))` for the free slot `s` would
    /// take, `Err(None)` if every slot is taken by other strings.
    fn find(&self, s: &str) -> Result<StringHandle, Option<usize>> {
        for slot in MsiProbe::new(hash_bytes(s.as_bytes()), self.slot_log2) {
            let len = self.lengths[slot];
            if len == EMPTY {
                return Err(Some(slot));
            }
            let start = self.offsets[slot] as usize;
            if self.buffer[start..start + len as usize] == *s.as_bytes() {
                return Ok(StringHandle(slot as u32));
            }
        }
        Err(None)
    }
}

// SAFETY: the storage is owned exclusively by the table and comes from the
// stateless, process-wide `SystemAllocator`, so moving the table to another
// thread moves sole ownership of plain bytes.
unsafe impl Send for StringTable {}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}
