//! # STRATA Core
//!
//! Explicit-allocator memory substrate designed for:
//! - Per-frame and per-request scratch memory released in one step
//! - Containers that never touch the global heap behind your back
//! - Fatal, loud failure when a memory budget is exceeded
//!
//! ## Architecture Rules
//!
//! 1. **Allocation is a capability** - every container is handed the
//!    [`Allocator`] it may use and uses nothing else
//! 2. **Budgets are hard** - exhausting an arena or a fixed container is a
//!    contract violation, reported through [`error::fatal`]
//! 3. **Reset needs exclusivity** - an allocator can only rewind once every
//!    container borrowing it is gone
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_core::{ArenaAllocator, DynArray, SystemAllocator, megabytes};
//!
//! let frame = ArenaAllocator::new(SystemAllocator::instance(), megabytes(32));
//! let mut visible = DynArray::new(&frame);
//! visible.push(42u32);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod collections;
pub mod console;
pub mod error;
pub mod memory;

pub use collections::{DynArray, FixedArray, FixedRing};
pub use console::{LineLog, LineRecord, LINE_BYTES};
pub use error::{fatal, MemoryError, MemoryResult, OrFatal};
pub use memory::{
    align_up, dup_bytes, dup_str, gigabytes, kilobytes, megabytes, next_pow2, try_dup_bytes,
    AllocBox, AllocSlice, Allocator, ArenaAllocator, BlockAllocator, BlockHandle, BumpAllocator,
    SystemAllocator, MAX_ALIGN,
};
