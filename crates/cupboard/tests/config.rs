// crates/cupboard/tests/config.rs
// ============================================================================
// Module: Cupboard Config Tests
// Description: TOML parsing and validation of open options.
// Purpose: Ensure configuration fails closed on unknown or invalid input.
// ============================================================================

//! ## Overview
//! Covers defaults, flag aliases, unknown fields, limits, and file loading.

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

use std::path::PathBuf;

use cupboard::Cupboard;
use cupboard::CupboardConfig;
use cupboard::CupboardError;
use cupboard::JournalMode;
use cupboard::MappingStore;
use cupboard::OpenMode;
use cupboard::SyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn minimal_config_uses_defaults() {
    let config: CupboardConfig = "path = \"store.db\"".parse().unwrap();
    assert_eq!(config, CupboardConfig::new("store.db"));
    assert_eq!(config.mode, OpenMode::Create);
    assert!(!config.writeback);
    assert_eq!(config.busy_timeout_ms, 5_000);
    assert_eq!(config.journal_mode, JournalMode::Delete);
    assert_eq!(config.sync_mode, SyncMode::Full);
    assert_eq!(config.keys_page_size, 256);
}

#[test]
fn full_config_is_parsed() {
    let config: CupboardConfig = r#"
        path = "data/store.db"
        mode = "create"
        writeback = true
        busy_timeout_ms = 250
        journal_mode = "wal"
        sync_mode = "normal"
        keys_page_size = 16
    "#
    .parse()
    .unwrap();
    assert_eq!(config.path, PathBuf::from("data/store.db"));
    assert!(config.writeback);
    assert_eq!(config.busy_timeout_ms, 250);
    assert_eq!(config.journal_mode, JournalMode::Wal);
    assert_eq!(config.sync_mode, SyncMode::Normal);
    assert_eq!(config.keys_page_size, 16);
}

#[test]
fn single_letter_flag_is_accepted() {
    let config: CupboardConfig = "path = \"store.db\"\nmode = \"c\"".parse().unwrap();
    assert_eq!(config.mode, OpenMode::Create);
}

#[test]
fn unsupported_flag_fails_validation() {
    let err = "path = \"store.db\"\nmode = \"r\"".parse::<CupboardConfig>().unwrap_err();
    assert!(matches!(err, CupboardError::UnsupportedMode(_)));
}

#[test]
fn unknown_field_is_rejected() {
    let err = "path = \"store.db\"\nextension = \".db\"".parse::<CupboardConfig>().unwrap_err();
    assert!(matches!(err, CupboardError::Parse(_)));
}

#[test]
fn missing_path_is_rejected() {
    let err = "writeback = true".parse::<CupboardConfig>().unwrap_err();
    assert!(matches!(err, CupboardError::Parse(_)));
}

#[test]
fn zero_page_size_is_rejected() {
    let err = "path = \"store.db\"\nkeys_page_size = 0".parse::<CupboardConfig>().unwrap_err();
    assert!(matches!(err, CupboardError::Invalid(_)));
}

#[test]
fn empty_path_is_rejected() {
    let err = "path = \"\"".parse::<CupboardConfig>().unwrap_err();
    assert!(matches!(err, CupboardError::Invalid(_)));
}

#[test]
fn open_mode_parses_letters_and_names() {
    assert_eq!("c".parse::<OpenMode>().unwrap(), OpenMode::Create);
    assert_eq!("new".parse::<OpenMode>().unwrap(), OpenMode::New);
    assert_eq!(OpenMode::Write.flag(), "w");
    assert!(matches!("x".parse::<OpenMode>(), Err(CupboardError::UnsupportedMode(_))));
    assert!(OpenMode::New.ensure_supported().is_err());
}

// ============================================================================
// SECTION: Loading
// ============================================================================

#[test]
fn config_file_opens_a_working_store() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("store.db");
    let config_path = temp.path().join("cupboard.toml");
    std::fs::write(
        &config_path,
        format!("path = {:?}\nwriteback = true\nkeys_page_size = 1\n", db_path.to_str().unwrap()),
    )
    .unwrap();

    let config = CupboardConfig::load(&config_path).unwrap();
    let mut db = Cupboard::open(config).unwrap();
    assert!(db.writeback());
    assert_eq!(db.path(), db_path.as_path());
    db.set("b", 2).unwrap();
    db.set("a", 1).unwrap();
    let keys = db.keys().unwrap().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn oversized_config_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("cupboard.toml");
    let padding = "#".repeat(64 * 1024);
    std::fs::write(&config_path, format!("path = \"store.db\"\n{padding}\n")).unwrap();
    let err = CupboardConfig::load(&config_path).unwrap_err();
    assert!(matches!(err, CupboardError::Invalid(_)));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let temp = TempDir::new().unwrap();
    let err = CupboardConfig::load(&temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, CupboardError::Io(_)));
}

#[test]
fn non_utf8_config_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("cupboard.toml");
    std::fs::write(&config_path, [0xff, 0xfe, 0x00]).unwrap();
    let err = CupboardConfig::load(&config_path).unwrap_err();
    assert!(matches!(err, CupboardError::Invalid(_)));
}
