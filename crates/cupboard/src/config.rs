// crates/cupboard/src/config.rs
// ============================================================================
// Module: Cupboard Configuration
// Description: Open options and TOML loading for cupboard stores.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! [`CupboardConfig`] carries everything needed to open a store: the backing
//! file, the open mode, writeback, and the `SQLite` pragmas applied to the
//! connection. It can be built in code or loaded from a TOML file; either way
//! [`CupboardConfig::validate`] runs before a connection is opened.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::CupboardError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of keys fetched per enumeration page.
const DEFAULT_KEYS_PAGE_SIZE: usize = 256;
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Modes
// ============================================================================

/// Requested open mode, using the same letters as `shelve`-style flags.
///
/// Only [`OpenMode::Create`] is implemented; the others are recognised so they
/// can be rejected explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Open an existing file read-only (`r`).
    #[serde(alias = "r")]
    Read,
    /// Open an existing file read-write (`w`).
    #[serde(alias = "w")]
    Write,
    /// Create the file if needed and open read-write (`c`).
    #[default]
    #[serde(alias = "c")]
    Create,
    /// Always create a new, empty file (`n`).
    #[serde(alias = "n")]
    New,
}

impl OpenMode {
    /// Returns the single-letter flag for the mode.
    #[must_use]
    pub const fn flag(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::Create => "c",
            Self::New => "n",
        }
    }

    /// Fails unless the mode is create-or-open.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError::UnsupportedMode`] for every other mode.
    pub fn ensure_supported(self) -> Result<(), CupboardError> {
        if self == Self::Create {
            return Ok(());
        }
        Err(CupboardError::UnsupportedMode(format!(
            "only flag \"c\" (create) is implemented, got \"{}\"",
            self.flag()
        )))
    }
}

impl FromStr for OpenMode {
    type Err = CupboardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "r" | "read" => Ok(Self::Read),
            "w" | "write" => Ok(Self::Write),
            "c" | "create" => Ok(Self::Create),
            "n" | "new" => Ok(Self::New),
            other => Err(CupboardError::UnsupportedMode(format!("unknown flag \"{other}\""))),
        }
    }
}

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Rollback journal; the file is self-contained at rest.
    #[default]
    Delete,
    /// WAL journal mode.
    Wal,
}

impl JournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Wal => "wal",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for opening a cupboard.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `mode` must be [`OpenMode::Create`] for the open to succeed.
/// - `keys_page_size` must be greater than zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CupboardConfig {
    /// Path to the `SQLite` database file, used exactly as given.
    pub path: PathBuf,
    /// Requested open mode.
    #[serde(default)]
    pub mode: OpenMode,
    /// Cache mutable values and persist them on sync/close.
    #[serde(default)]
    pub writeback: bool,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SyncMode,
    /// Keys fetched per page during lazy key enumeration.
    #[serde(default = "default_keys_page_size")]
    pub keys_page_size: usize,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default key enumeration page size.
const fn default_keys_page_size() -> usize {
    DEFAULT_KEYS_PAGE_SIZE
}

impl CupboardConfig {
    /// Builds a create-or-open configuration with defaults for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: OpenMode::Create,
            writeback: false,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::default(),
            sync_mode: SyncMode::default(),
            keys_page_size: DEFAULT_KEYS_PAGE_SIZE,
        }
    }

    /// Sets writeback mode.
    #[must_use]
    pub const fn with_writeback(mut self, writeback: bool) -> Self {
        self.writeback = writeback;
        self
    }

    /// Sets the open mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the key enumeration page size.
    #[must_use]
    pub const fn with_keys_page_size(mut self, keys_page_size: usize) -> Self {
        self.keys_page_size = keys_page_size;
        self
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the file cannot be read, exceeds the
    /// size limit, fails to parse, or fails validation.
    pub fn load(path: &Path) -> Result<Self, CupboardError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| CupboardError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(CupboardError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| CupboardError::Invalid("config file must be utf-8".to_string()))?;
        content.parse()
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError::UnsupportedMode`] for a mode other than
    /// create, or [`CupboardError::Invalid`] for bad limits or paths.
    pub fn validate(&self) -> Result<(), CupboardError> {
        self.mode.ensure_supported()?;
        if self.keys_page_size == 0 {
            return Err(CupboardError::Invalid(
                "keys_page_size must be greater than zero".to_string(),
            ));
        }
        validate_path(&self.path)
    }
}

impl FromStr for CupboardConfig {
    type Err = CupboardError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Self =
            toml::from_str(content).map_err(|err| CupboardError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates file paths for safety limits.
fn validate_path(path: &Path) -> Result<(), CupboardError> {
    if path.as_os_str().is_empty() {
        return Err(CupboardError::Invalid("path must not be empty".to_string()));
    }
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(CupboardError::Invalid("path exceeds length limit".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(CupboardError::Invalid("path contains an overlong component".to_string()));
    }
    if path.is_dir() {
        return Err(CupboardError::Invalid("path must be a file, not a directory".to_string()));
    }
    Ok(())
}
