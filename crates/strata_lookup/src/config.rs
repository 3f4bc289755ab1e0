//! # Memory Configuration
//!
//! Budgets for the shared string table, the per-frame arenas and the console,
//! loaded once at startup from TOML.
//!
//! ```toml
//! [string_table]
//! byte_capacity = 16777216
//! slot_log2 = 16
//!
//! [arenas]
//! frame_bytes = 33554432
//! scratch_bytes = 1048576
//!
//! [console]
//! lines = 1024
//! ```
//!
//! Every key is optional; missing keys keep their default.

use std::path::Path;

use serde::Deserialize;
use strata_core::memory::megabytes;
use thiserror::Error;

use crate::string_table::{DEFAULT_BYTE_CAPACITY, DEFAULT_SLOT_LOG2};

/// Errors raised while loading a [`MemoryConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Budget of the shared [`StringTable`](crate::StringTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StringTableConfig {
    /// Bytes of string data.
    pub byte_capacity: usize,
    /// Slot count exponent.
    pub slot_log2: u32,
}

impl Default for StringTableConfig {
    fn default() -> Self {
        Self {
            byte_capacity: DEFAULT_BYTE_CAPACITY,
            slot_log2: DEFAULT_SLOT_LOG2,
        }
    }
}

/// Sizes of the arenas handed out by [`MemoryContext`](crate::MemoryContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArenaConfig {
    /// Per-frame arena, reset every frame.
    pub frame_bytes: usize,
    /// Short-lived scratch arena.
    pub scratch_bytes: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            frame_bytes: megabytes(32),
            scratch_bytes: megabytes(1),
        }
    }
}

/// Debug console history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Lines kept; must be a power of two.
    pub lines: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { lines: 1024 }
    }
}

/// All memory budgets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryConfig {
    /// `[string_table]` section.
    pub string_table: StringTableConfig,
    /// `[arenas]` section.
    pub arenas: ArenaConfig,
    /// `[console]` section.
    pub console: ConsoleConfig,
}

impl MemoryConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed input, [`ConfigError::Invalid`]
    /// when a budget is out of range.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), ?config, "memory config loaded");
        Ok(config)
    }

    /// Checks every budget.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> ConfigResult<()> {
        let table = &self.string_table;
        if !(1..=31).contains(&table.slot_log2) {
            return Err(ConfigError::Invalid(format!(
                "string_table.slot_log2 = {} must be within 1..=31",
                table.slot_log2
            )));
        }
        if table.byte_capacity == 0 || table.byte_capacity >= u32::MAX as usize {
            return Err(ConfigError::Invalid(format!(
                "string_table.byte_capacity = {} must be within 1..{}",
                table.byte_capacity,
                u32::MAX
            )));
        }
        if self.arenas.frame_bytes == 0 {
            return Err(ConfigError::Invalid("arenas.frame_bytes must be non-zero".into()));
        }
        if self.arenas.scratch_bytes == 0 {
            return Err(ConfigError::Invalid("arenas.scratch_bytes must be non-zero".into()));
        }
        if !self.console.lines.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "console.lines = {} must be a power of two",
                self.console.lines
            )));
        }
        Ok(())
    }
}
