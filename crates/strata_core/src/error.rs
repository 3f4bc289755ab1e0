//! # Memory Error Types
//!
//! All conditions the substrate can report.
//!
//! Almost every one of them is a sizing bug rather than a transient state, so
//! the plain (non-`try_`) operations escalate them through [`fatal`].

use thiserror::Error;

/// Errors that can occur while allocating or filling a fixed budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// A bounded allocator could not satisfy a request.
    #[error("out of memory: requested {requested} bytes, {remaining} remaining")]
    OutOfMemory {
        /// Bytes requested (after alignment rounding).
        requested: usize,
        /// Bytes left in the region.
        remaining: usize,
    },

    /// Alignment was zero, not a power of two, or above what the allocator supports.
    #[error("invalid alignment: {0}")]
    InvalidAlignment(usize),

    /// A fixed-capacity container is full.
    #[error("capacity exceeded: container holds at most {capacity} elements")]
    CapacityExceeded {
        /// The fixed capacity.
        capacity: usize,
    },

    /// Every block of a block pool is in use.
    #[error("block pool exhausted: all {blocks} blocks in use")]
    PoolExhausted {
        /// Number of blocks in the pool.
        blocks: usize,
    },

    /// An open-addressing table has no free slot left.
    #[error("table full: all {slots} slots occupied")]
    TableFull {
        /// Slot count of the table.
        slots: usize,
    },

    /// The key byte arena of a lookup table is exhausted.
    #[error("key storage exhausted: key needs {requested} bytes, {remaining} remaining")]
    KeyStorageExhausted {
        /// Length of the key being inserted.
        requested: usize,
        /// Bytes left in the key arena.
        remaining: usize,
    },

    /// The byte buffer of a string table is exhausted.
    #[error("string storage exhausted: string needs {requested} bytes, {remaining} remaining")]
    StringStorageExhausted {
        /// Length of the string being interned.
        requested: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// The platform heap refused a request.
    #[error("heap allocation of {size} bytes failed")]
    HeapFailure {
        /// Size of the failed request.
        size: usize,
    },
}

/// Result type for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Terminates on an unrecoverable memory condition.
///
/// The error is recorded through `tracing` first so the diagnostic survives
/// even when the panic strategy is `abort`.
#[cold]
#[inline(never)]
#[track_caller]
pub fn fatal(err: MemoryError) -> ! {
    let location = std::panic::Location::caller();
    tracing::error!(error = %err, %location, "fatal memory condition");
    panic!("fatal memory condition: {err}");
}

/// Unwraps a memory result, escalating any error through [`fatal`].
pub trait OrFatal<T> {
    /// Returns the value or terminates with the error's diagnostic.
    fn or_fatal(self) -> T;
}

impl<T> OrFatal<T> for MemoryResult<T> {
    #[inline]
    #[track_caller]
    fn or_fatal(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => fatal(err),
        }
    }
}
