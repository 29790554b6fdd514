// crates/cupboard/src/codec.rs
// ============================================================================
// Module: Cupboard Codec
// Description: JSON text encoding for stored values.
// Purpose: Deterministic, tool-readable serialization of the value column.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Values are stored as compact JSON text. Mapping keys are emitted in sorted
//! order, so the same value always encodes to the same text. Encoding
//! validates first and never coerces; decoding treats malformed stored text as
//! corruption rather than caller error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::CupboardError;
use crate::value::Value;

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Encodes a value into its stored text form.
///
/// # Errors
///
/// Returns [`CupboardError::UnsupportedValue`] when the value fails
/// validation.
pub fn encode(value: &Value) -> Result<String, CupboardError> {
    value.validate()?;
    serde_json::to_string(value).map_err(|err| CupboardError::UnsupportedValue(err.to_string()))
}

/// Decodes stored text into a value.
///
/// # Errors
///
/// Returns [`CupboardError::Corrupt`] when the text is not valid JSON.
///
/// Floats are parsed exactly, so `decode(&encode(v)?)` equals `v` for every
/// value that encodes.
pub fn decode(text: &str) -> Result<Value, CupboardError> {
    serde_json::from_str(text).map_err(|err| CupboardError::Corrupt(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn encode_is_deterministic_across_insertion_order() {
        let forward: Value = [("a", 1), ("b", 2)].into_iter().collect();
        let reverse: Value = [("b", 2), ("a", 1)].into_iter().collect();
        assert_eq!(encode(&forward).unwrap(), encode(&reverse).unwrap());
        assert_eq!(encode(&forward).unwrap(), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn encode_rejects_infinity_instead_of_writing_null() {
        let err = encode(&Value::Float(f64::INFINITY)).unwrap_err();
        assert!(matches!(err, CupboardError::UnsupportedValue(_)));
    }

    #[test]
    fn decode_keeps_float_and_integer_distinct() {
        assert_eq!(decode("3").unwrap(), Value::Integer(3));
        assert_eq!(decode("3.0").unwrap(), Value::Float(3.0));
        assert_eq!(encode(&Value::Float(3.0)).unwrap(), "3.0");
    }

    #[test]
    fn float_decodes_to_the_exact_value_encoded() {
        let value = Value::Float(-2.180_324_989_943_507e-76);
        let encoded = encode(&value).unwrap();
        assert_eq!(encoded, "-2.180324989943507e-76");
        assert_eq!(decode(&encoded).unwrap(), value);
        for bits in [f64::MIN_POSITIVE, f64::MAX, f64::EPSILON, 0.1 + 0.2, -1.0 / 3.0] {
            let value = Value::Float(bits);
            assert_eq!(decode(&encode(&value).unwrap()).unwrap(), value);
        }
    }

    #[test]
    fn decode_widens_large_unsigned_to_float() {
        assert_eq!(decode("18446744073709551615").unwrap(), Value::Float(1.844_674_407_370_955_2e19));
    }

    #[test]
    fn decode_reports_garbage_as_corruption() {
        assert!(matches!(decode("{not json"), Err(CupboardError::Corrupt(_))));
        assert!(matches!(decode("NaN"), Err(CupboardError::Corrupt(_))));
    }
}
