// crates/cupboard/src/error.rs
// ============================================================================
// Module: Cupboard Errors
// Description: Error taxonomy shared by the value model, codec, and store.
// Purpose: Keep failure kinds distinguishable so callers can branch on them.
// Dependencies: rusqlite, thiserror
// ============================================================================

//! ## Overview
//! Every fallible cupboard operation returns [`CupboardError`]. Caller misuse
//! (bad keys, unsupported values, use after close) is reported separately from
//! storage-layer failures, which are surfaced as-is and never retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Cupboard errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Error messages may name keys but never embed encoded values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CupboardError {
    /// Key is not usable as a cupboard key.
    #[error("invalid cupboard key: {0}")]
    InvalidKey(String),
    /// Value (or nested content) is outside the supported shape set.
    #[error("unsupported cupboard value: {0}")]
    UnsupportedValue(String),
    /// Lookup of an absent key.
    #[error("key not found: {0}")]
    KeyNotFound(String),
    /// Operation attempted on a closed cupboard.
    #[error("invalid operation: cupboard is closed")]
    Closed,
    /// Open mode other than create-or-open was requested.
    #[error("unsupported open mode: {0}")]
    UnsupportedMode(String),
    /// A cached shared value is mutably borrowed and cannot be flushed.
    #[error("cached value for key {0} is mutably borrowed")]
    ValueBorrowed(String),
    /// Stored data is not a valid encoded value.
    #[error("cupboard corruption: {0}")]
    Corrupt(String),
    /// `SQLite` engine error.
    #[error("cupboard db error: {0}")]
    Db(String),
    /// Filesystem error.
    #[error("cupboard io error: {0}")]
    Io(String),
    /// Invalid configuration.
    #[error("invalid cupboard configuration: {0}")]
    Invalid(String),
    /// Configuration file could not be parsed.
    #[error("cupboard configuration parse error: {0}")]
    Parse(String),
}

impl CupboardError {
    /// Returns true when the error reports an absent key.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }

    /// Returns true when the error reports use of a closed cupboard.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<rusqlite::Error> for CupboardError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}
