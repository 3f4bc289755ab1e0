//! # Memory Context
//!
//! The process-wide memory state, built once at startup and passed by
//! reference to every subsystem that interns strings or needs a frame arena.
//!
//! Replaces a global interner: ownership and thread access are explicit, and
//! the string table's mutex is the only lock in this crate.

use parking_lot::Mutex;
use strata_core::{ArenaAllocator, LineLog, SystemAllocator};

use crate::config::{ConfigResult, MemoryConfig};
use crate::string_table::{StringHandle, StringTable, StringTableStats};

/// Shared interner plus configured allocator budgets.
///
/// # Example
///
/// ```rust,ignore
/// let context = MemoryContext::new(&MemoryConfig::load("config/memory.toml")?)?;
/// let script = context.intern("main.lua");
/// let frame = context.frame_arena();
/// ```
pub struct MemoryContext {
    config: MemoryConfig,
    strings: Mutex<StringTable>,
}

impl MemoryContext {
    /// Validates `config` and builds the shared string table.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`](crate::ConfigError::Invalid) if a budget is
    /// out of range.
    pub fn new(config: &MemoryConfig) -> ConfigResult<Self> {
        config.validate()?;
        let table = &config.string_table;
        Ok(Self {
            config: *config,
            strings: Mutex::new(StringTable::with_capacity(table.byte_capacity, table.slot_log2)),
        })
    }

    /// The budgets this context was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Interns `s` in the shared table.
    ///
    /// # Panics
    ///
    /// Fatal if the string table is exhausted.
    #[track_caller]
    pub fn intern(&self, s: &str) -> StringHandle {
        self.strings.lock().intern(s)
    }

    /// Handle of `s` if it was interned.
    #[must_use]
    pub fn handle_for(&self, s: &str) -> Option<StringHandle> {
        self.strings.lock().handle_for(s)
    }

    /// Owned copy of the string behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not produced by this context.
    #[must_use]
    #[track_caller]
    pub fn resolve(&self, handle: StringHandle) -> String {
        self.strings.lock().lookup(handle).to_owned()
    }

    /// Runs `f` with the string table locked, for borrowing without copies.
    pub fn with_strings<R>(&self, f: impl FnOnce(&StringTable) -> R) -> R {
        f(&self.strings.lock())
    }

    /// Current string table occupancy.
    #[must_use]
    pub fn string_stats(&self) -> StringTableStats {
        self.strings.lock().stats()
    }

    /// A fresh per-frame arena of `arenas.frame_bytes` from the heap.
    ///
    /// # Panics
    ///
    /// Fatal if the heap cannot provide the buffer.
    #[must_use]
    #[track_caller]
    pub fn frame_arena(&self) -> ArenaAllocator<'static> {
        ArenaAllocator::new(SystemAllocator::instance(), self.config.arenas.frame_bytes)
    }

    /// A fresh scratch arena of `arenas.scratch_bytes` from the heap.
    ///
    /// # Panics
    ///
    /// Fatal if the heap cannot provide the buffer.
    #[must_use]
    #[track_caller]
    pub fn scratch_arena(&self) -> ArenaAllocator<'static> {
        ArenaAllocator::new(SystemAllocator::instance(), self.config.arenas.scratch_bytes)
    }

    /// A console history of `console.lines` lines.
    #[must_use]
    #[track_caller]
    pub fn line_log(&self) -> LineLog<'static> {
        LineLog::new(self.config.console.lines, SystemAllocator::instance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use strata_core::Allocator;

    fn context() -> MemoryContext {
        let config = MemoryConfig::from_toml_str(
            "[string_table]\nbyte_capacity = 4096\nslot_log2 = 8\n\
             [arenas]\nframe_bytes = 8192\nscratch_bytes = 1024\n\
             [console]\nlines = 8\n",
        )
        .unwrap();
        MemoryContext::new(&config).unwrap()
    }

    #[test]
    fn test_shared_interning() {
        let context = context();
        let main = context.intern("main.lua");
        assert_eq!(context.intern("main.lua"), main);
        assert_eq!(context.handle_for("main.lua"), Some(main));
        assert_eq!(context.resolve(main), "main.lua");
        assert_eq!(context.with_strings(|s| s.lookup(main).len()), 8);
        assert_eq!(context.string_stats().strings_used, 1);
    }

    #[test]
    fn test_arenas_follow_config() {
        let context = context();
        assert_eq!(context.frame_arena().total_bytes(), Some(8192));
        assert_eq!(context.scratch_arena().total_bytes(), Some(1024));
        assert_eq!(context.line_log().capacity(), 8);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = MemoryConfig::default();
        config.console.lines = 3;
        assert!(matches!(MemoryContext::new(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_threads_share_one_table() {
        let context = context();
        let handles: Vec<_> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| ["grass", "stone", "water"].map(|s| context.intern(s))))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert!(handles.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(context.string_stats().strings_used, 3);
    }
}
