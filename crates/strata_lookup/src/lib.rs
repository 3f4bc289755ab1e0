//! # STRATA Lookup
//!
//! Fixed-budget tables built on the [`strata_core`] allocators:
//! - [`LookupTable`] - bytes to value, insert-once, MSI open addressing
//! - [`StringTable`] - engine-wide string interning behind 32-bit handles
//! - [`Dictionary`] - 4-ary hash trie over interned strings, grows per node
//!
//! ## Architecture Rules
//!
//! 1. **Size once** - tables never rehash; overflow is fatal, a miss is `None`
//! 2. **Deterministic hashing** - one fixed seed, same slots on every run
//! 3. **No hidden globals** - the shared interner lives in [`MemoryContext`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_lookup::{MemoryConfig, MemoryContext};
//!
//! let context = MemoryContext::new(&MemoryConfig::default())?;
//! let handle = context.intern("main.lua");
//! assert_eq!(context.resolve(handle), "main.lua");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod context;
pub mod dictionary;
pub mod hash;
pub mod lookup_table;
pub mod string_table;

pub use config::{ArenaConfig, ConfigError, ConfigResult, ConsoleConfig, MemoryConfig, StringTableConfig};
pub use context::MemoryContext;
pub use dictionary::Dictionary;
pub use hash::{hash_bytes, MsiProbe, HASH_SEED};
pub use lookup_table::{LookupTable, KEY_BYTES};
pub use string_table::{StringHandle, StringTable, StringTableStats};
pub use strata_core::error::{MemoryError, MemoryResult};
