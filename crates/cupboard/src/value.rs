// crates/cupboard/src/value.rs
// ============================================================================
// Module: Cupboard Values
// Description: Closed value model for everything a cupboard can store.
// Purpose: Reject unsupported shapes at the boundary instead of in the codec.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`Value`] is the closed set of shapes a cupboard persists: null, booleans,
//! integers, floats, text, sequences, and text-keyed mappings. The enum makes
//! most unsupported inputs unrepresentable; [`Value::validate`] catches the
//! rest (non-finite floats and excessive nesting) before anything is written.
//!
//! Reads hand out [`SharedValue`] cells. In writeback mode the store keeps a
//! clone of the same `Rc`, so in-place edits by the caller are flushed later.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;
use serde::Serialize;

use crate::error::CupboardError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of nested sequences/mappings accepted in a single value.
///
/// Kept well below the decoder recursion limit so anything that encodes can
/// also be decoded.
pub const MAX_NESTING_DEPTH: usize = 64;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Shared, interior-mutable handle to a value.
///
/// In writeback mode the cupboard holds a clone of this `Rc` for mutable
/// shapes, so edits made through it are persisted by the next sync.
pub type SharedValue = Rc<RefCell<Value>>;

/// Wraps a value in a fresh [`SharedValue`] cell.
#[must_use]
pub fn share(value: impl Into<Value>) -> SharedValue {
    Rc::new(RefCell::new(value.into()))
}

/// A value that can be stored in a cupboard.
///
/// Serialized untagged, so the JSON form is plain JSON. Whole numbers that
/// fit an `i64` decode as [`Value::Integer`]; every other number decodes as
/// [`Value::Float`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// JSON null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Finite 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Ordered sequence of values.
    Sequence(Vec<Self>),
    /// Mapping from text keys to values.
    Mapping(BTreeMap<String, Self>),
}

/// Shape classification of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// Null.
    Null,
    /// Boolean.
    Boolean,
    /// Integer number.
    Integer,
    /// Floating point number.
    Float,
    /// Text.
    Text,
    /// Sequence.
    Sequence,
    /// Mapping.
    Mapping,
}

impl ValueShape {
    /// Returns a stable label for the shape.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
        }
    }

    /// Returns true for shapes that can be mutated in place.
    #[must_use]
    pub const fn is_mutable(self) -> bool {
        matches!(self, Self::Sequence | Self::Mapping)
    }
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Accessors
// ============================================================================

impl Value {
    /// Returns the shape of this value.
    #[must_use]
    pub const fn shape(&self) -> ValueShape {
        match self {
            Self::Null => ValueShape::Null,
            Self::Bool(_) => ValueShape::Boolean,
            Self::Integer(_) => ValueShape::Integer,
            Self::Float(_) => ValueShape::Float,
            Self::Text(_) => ValueShape::Text,
            Self::Sequence(_) => ValueShape::Sequence,
            Self::Mapping(_) => ValueShape::Mapping,
        }
    }

    /// Returns true for sequences and mappings.
    #[must_use]
    pub const fn is_mutable(&self) -> bool {
        self.shape().is_mutable()
    }

    /// Returns true for null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the number as a float. Integers are widened.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Widening integers to f64 is the documented intent.")]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the items, if this is a sequence.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Self]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the items mutably, if this is a sequence.
    pub const fn as_sequence_mut(&mut self) -> Option<&mut Vec<Self>> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries, if this is a mapping.
    #[must_use]
    pub const fn as_mapping(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns the entries mutably, if this is a mapping.
    pub const fn as_mapping_mut(&mut self) -> Option<&mut BTreeMap<String, Self>> {
        match self {
            Self::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Checks that the value, including nested content, can be persisted.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError::UnsupportedValue`] naming the offending
    /// location for non-finite floats or nesting beyond
    /// [`MAX_NESTING_DEPTH`].
    pub fn validate(&self) -> Result<(), CupboardError> {
        let mut path = String::from("$");
        validate_at(self, &mut path, 0)
    }
}

/// Recursively validates `value`, tracking its location in `path`.
fn validate_at(value: &Value, path: &mut String, depth: usize) -> Result<(), CupboardError> {
    match value {
        Value::Float(number) if !number.is_finite() => Err(CupboardError::UnsupportedValue(
            format!("non-finite float at {path}"),
        )),
        Value::Sequence(_) | Value::Mapping(_) if depth >= MAX_NESTING_DEPTH => {
            Err(CupboardError::UnsupportedValue(format!(
                "nesting exceeds {MAX_NESTING_DEPTH} levels at {path}"
            )))
        }
        Value::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                let mark = path.len();
                path.push('[');
                path.push_str(&index.to_string());
                path.push(']');
                validate_at(item, path, depth + 1)?;
                path.truncate(mark);
            }
            Ok(())
        }
        Value::Mapping(entries) => {
            for (key, item) in entries {
                let mark = path.len();
                path.push('.');
                path.push_str(key);
                validate_at(item, path, depth + 1)?;
                path.truncate(mark);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Implements lossless integer conversions into [`Value::Integer`].
macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Integer(i64::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl TryFrom<u64> for Value {
    type Error = CupboardError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(Self::Integer).map_err(|_| {
            CupboardError::UnsupportedValue(format!("integer {value} exceeds the i64 range"))
        })
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(entries: BTreeMap<String, Self>) -> Self {
        Self::Mapping(entries)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Self>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Mapping(iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = CupboardError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(flag) => Ok(Self::Bool(flag)),
            serde_json::Value::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    Ok(Self::Integer(integer))
                } else if let Some(unsigned) = number.as_u64() {
                    Self::try_from(unsigned)
                } else {
                    number.as_f64().map(Self::Float).ok_or_else(|| {
                        CupboardError::UnsupportedValue(format!("number {number} is not an f64"))
                    })
                }
            }
            serde_json::Value::String(text) => Ok(Self::Text(text)),
            serde_json::Value::Array(items) => {
                items.into_iter().map(Self::try_from).collect::<Result<Vec<_>, _>>().map(Self::Sequence)
            }
            serde_json::Value::Object(entries) => entries
                .into_iter()
                .map(|(key, item)| Self::try_from(item).map(|item| (key, item)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Self::Mapping),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
