// crates/cupboard/tests/proptest_roundtrip.rs
// ============================================================================
// Module: Cupboard Property Tests
// Description: Property-based store round-trip checks.
// Purpose: Ensure any supported value reads back equal to what was stored.
// ============================================================================

//! ## Overview
//! Generates arbitrary finite values and checks that a store-then-read cycle
//! through a reopened cupboard returns an equal value in both modes.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;

use cupboard::MappingStore;
use cupboard::OpenMode;
use cupboard::Value;
use cupboard::codec;
use proptest::prelude::*;
use tempfile::TempDir;

// ============================================================================
// SECTION: Strategies
// ============================================================================

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        any::<f64>().prop_filter("finite", |x| x.is_finite()).prop_map(Value::Float),
        ".{0,16}".prop_map(Value::Text),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 6).prop_map(Value::Sequence),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0 .. 6)
                .prop_map(|map: BTreeMap<String, Value>| Value::Mapping(map)),
        ]
    })
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stored_float_reads_back_bit_for_bit(
        number in any::<f64>().prop_filter("finite", |x| x.is_finite()),
    ) {
        let value = Value::Float(number);
        prop_assert_eq!(codec::decode(&codec::encode(&value).unwrap()).unwrap(), value.clone());

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("db.sqlite");
        {
            let mut db = cupboard::open(&path, OpenMode::Create, false).unwrap();
            db.set("f", value.clone()).unwrap();
        }
        let mut db = cupboard::open(&path, OpenMode::Create, false).unwrap();
        let read = db.get("f").unwrap().borrow().as_f64().unwrap();
        prop_assert_eq!(read.to_bits(), number.to_bits());
    }

    #[test]
    fn codec_roundtrip_preserves_value(value in value_strategy()) {
        let encoded = codec::encode(&value).unwrap();
        prop_assert_eq!(codec::decode(&encoded).unwrap(), value);
    }

    #[test]
    fn stored_value_reads_back_after_reopen(
        key in ".{0,12}".prop_filter("no NUL", |key: &String| !key.contains('\0')),
        value in value_strategy(),
        writeback in any::<bool>(),
    ) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("db.sqlite");
        {
            let mut db = cupboard::open(&path, OpenMode::Create, writeback).unwrap();
            db.set(&key, value.clone()).unwrap();
            let read = db.get(&key).unwrap().borrow().clone();
            prop_assert_eq!(&read, &value);
            db.close().unwrap();
        }
        let mut db = cupboard::open(&path, OpenMode::Create, false).unwrap();
        let read = db.get(&key).unwrap().borrow().clone();
        prop_assert_eq!(read, value);
        prop_assert_eq!(db.size().unwrap(), 1);
    }
}
