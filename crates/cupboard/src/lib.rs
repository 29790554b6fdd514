// crates/cupboard/src/lib.rs
// ============================================================================
// Module: Cupboard
// Description: Persistent dictionary-like store on SQLite with JSON values.
// Purpose: Durable, inspectable, cross-tool-readable mapping storage.
// Dependencies: rusqlite, serde, serde_json, thiserror, toml, tracing
// ============================================================================

//! ## Overview
//! A cupboard works like an in-memory mapping but lives in a single `SQLite`
//! file. Keys are text; values are [`Value`]s stored as JSON text, so the file
//! can be read and edited by any `SQLite` client. The file uses one table:
//!
//! ```sql
//! CREATE TABLE cupboard (key TEXT PRIMARY KEY, value TEXT NOT NULL)
//! ```
//!
//! ```no_run
//! use cupboard::MappingStore;
//! use cupboard::OpenMode;
//!
//! # fn main() -> Result<(), cupboard::CupboardError> {
//! let mut db = cupboard::open("db-filename", OpenMode::Create, false)?;
//! db.set("foo", 123)?;
//! db.set("bar", vec![cupboard::Value::from("a"), "b".into(), 42.into()])?;
//! let foo = db.get("foo")?.borrow().as_i64().unwrap_or_default();
//! db.set("baz", foo + 3)?;
//! assert_eq!(db.size()?, 3);
//! db.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Dropping a [`Cupboard`] closes it, so scope-based use needs no explicit
//! `close`. A cupboard must stay on the thread that opened it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod codec;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod store;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::CupboardConfig;
pub use config::JournalMode;
pub use config::OpenMode;
pub use config::SyncMode;
pub use error::CupboardError;
pub use interfaces::MappingStore;
pub use store::Cupboard;
pub use store::Items;
pub use store::Keys;
pub use store::open;
pub use value::MAX_NESTING_DEPTH;
pub use value::SharedValue;
pub use value::Value;
pub use value::ValueShape;
pub use value::share;
