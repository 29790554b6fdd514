// crates/cupboard/src/interfaces.rs
// ============================================================================
// Module: Cupboard Interfaces
// Description: Backend-agnostic mapping contract.
// Purpose: Define the operation set every cupboard-style store exposes.
// Dependencies: crate::value, crate::error
// ============================================================================

//! ## Overview
//! [`MappingStore`] is the dictionary-shaped surface of a persistent store:
//! text keys, [`Value`] values, explicit sync, and idempotent close.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::CupboardError;
use crate::value::SharedValue;
use crate::value::Value;

// ============================================================================
// SECTION: Mapping Store
// ============================================================================

/// Persistent text-keyed mapping.
///
/// # Invariants
/// - Keys are unique; a write replaces any previous value for the key.
/// - After [`MappingStore::close`], every operation except `close` fails with
///   [`CupboardError::Closed`].
pub trait MappingStore {
    /// Lazy key enumeration borrowed from the store.
    type Keys<'a>: Iterator<Item = Result<String, CupboardError>>
    where
        Self: 'a;

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError::KeyNotFound`] when the key is absent.
    fn get(&mut self, key: &str) -> Result<SharedValue, CupboardError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError::UnsupportedValue`] when the value cannot be
    /// encoded; nothing is written in that case.
    fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), CupboardError>;

    /// Removes `key`. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the store is closed or the delete fails.
    fn delete(&mut self, key: &str) -> Result<(), CupboardError>;

    /// Returns true when `key` is present.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the store is closed or the lookup fails.
    fn contains(&self, key: &str) -> Result<bool, CupboardError>;

    /// Enumerates keys lazily.
    ///
    /// No order is part of this contract; implementations document any order
    /// they guarantee. [`crate::Cupboard`] yields keys in ascending byte-wise
    /// order of their UTF-8 text, which callers of that type may rely on.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError::Closed`] when the store is closed.
    fn keys(&self) -> Result<Self::Keys<'_>, CupboardError>;

    /// Returns the number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the store is closed or the count fails.
    fn size(&self) -> Result<usize, CupboardError>;

    /// Flushes deferred writes.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the store is closed or the flush fails.
    fn sync(&mut self) -> Result<(), CupboardError>;

    /// Flushes and releases the store. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the final flush or release fails; the
    /// store is closed regardless.
    fn close(&mut self) -> Result<(), CupboardError>;
}
