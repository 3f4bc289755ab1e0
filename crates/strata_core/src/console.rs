//! # Console Line Log
//!
//! Bounded history of log lines for an in-game debug console.
//!
//! Line records come from a [`BlockAllocator`]; a [`FixedRing`] of handles
//! keeps them in insertion order. Once the ring is full, the oldest record's
//! block is overwritten by the next line, so memory use is fixed at
//! construction and eviction is strictly oldest-first.

use bytemuck::{Pod, Zeroable};

use crate::collections::FixedRing;
use crate::error::{fatal, MemoryError};
use crate::memory::{Allocator, BlockAllocator, BlockHandle};

/// Maximum bytes kept per line; longer lines are truncated.
pub const LINE_BYTES: usize = 256;

/// One stored line.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct LineRecord {
    /// Number of valid bytes in `text`.
    len: u32,
    /// UTF-8 text, truncated on a character boundary.
    text: [u8; LINE_BYTES],
}

impl LineRecord {
    /// The stored text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only whole characters are ever copied in.
        std::str::from_utf8(&self.text[..self.len as usize]).unwrap_or_default()
    }

    fn store(&mut self, line: &str) {
        let mut end = line.len().min(LINE_BYTES);
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        self.text[..end].copy_from_slice(&line.as_bytes()[..end]);
        self.len = end as u32;
    }
}

/// Fixed-capacity line history with oldest-first eviction.
pub struct LineLog<'a> {
    records: BlockAllocator<'a, LineRecord>,
    order: FixedRing<'a, BlockHandle>,
}

impl<'a> LineLog<'a> {
    /// Creates a log holding the last `lines` lines.
    ///
    /// # Panics
    ///
    /// Panics if `lines` is not a power of two; fatal if the allocator cannot
    /// provide the record pool.
    #[must_use]
    #[track_caller]
    pub fn new(lines: usize, allocator: &'a dyn Allocator) -> Self {
        Self {
            order: FixedRing::new(lines, allocator),
            records: BlockAllocator::new(allocator, lines),
        }
    }

    /// Appends a line, reusing the oldest record once the log is full.
    pub fn push_line(&mut self, line: &str) {
        // The pool holds exactly as many records as the ring has slots, so a
        // block is free whenever the ring has room.
        let handle = if self.order.is_full() {
            self.order.pop()
        } else {
            self.records.allocate_block()
        };
        let Some(handle) = handle else {
            fatal(MemoryError::PoolExhausted { blocks: self.records.capacity() });
        };
        self.records.get_mut(handle).store(line);
        self.order.push(handle);
    }

    /// Number of stored lines.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no line was pushed yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of stored lines.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.order.capacity()
    }

    /// Stored lines from oldest to newest.
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(move |h| self.records.get(h).as_str())
    }

    /// Most recent line.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.order.back().map(|h| self.records.get(h).as_str())
    }
}
