// crates/cupboard/src/store.rs
// ============================================================================
// Module: SQLite Cupboard Store
// Description: Dictionary-shaped store backed by a single SQLite table.
// Purpose: Persist JSON-encoded values with immediate or writeback semantics.
// Dependencies: rusqlite, tracing
// ============================================================================

//! ## Overview
//! [`Cupboard`] implements [`MappingStore`] over one `SQLite` table:
//!
//! ```sql
//! CREATE TABLE cupboard (key TEXT PRIMARY KEY, value TEXT NOT NULL)
//! ```
//!
//! Every `set`/`delete` is a single atomic statement. In writeback mode,
//! sequence and mapping values handed out by reads are cached as
//! [`SharedValue`] cells; edits made through them are written by
//! [`MappingStore::sync`], which flushes the whole cache in one transaction.
//! Dropping a cupboard runs the same path as an explicit close.
//!
//! A cupboard is not thread-safe. Its cache holds `Rc` cells, so the type is
//! `!Send` and stays on the thread that opened it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use tracing::debug;
use tracing::warn;

use crate::codec;
use crate::config::CupboardConfig;
use crate::config::OpenMode;
use crate::error::CupboardError;
use crate::interfaces::MappingStore;
use crate::value::SharedValue;
use crate::value::Value;
use crate::value::share;

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Creates the backing table when absent.
const CREATE_QUERY: &str =
    "CREATE TABLE IF NOT EXISTS cupboard (key TEXT PRIMARY KEY, value TEXT NOT NULL)";
/// Point lookup of an encoded value.
const GET_QUERY: &str = "SELECT value FROM cupboard WHERE key = ?1";
/// Presence check without reading the value.
const CONTAINS_QUERY: &str = "SELECT 1 FROM cupboard WHERE key = ?1";
/// Upsert of an encoded value.
const SET_QUERY: &str = "INSERT OR REPLACE INTO cupboard (key, value) VALUES (?1, ?2)";
/// Delete by key.
const DELETE_QUERY: &str = "DELETE FROM cupboard WHERE key = ?1";
/// Delete every entry.
const CLEAR_QUERY: &str = "DELETE FROM cupboard";
/// First page of the key enumeration.
const KEYS_FIRST_PAGE_QUERY: &str = "SELECT key FROM cupboard ORDER BY key LIMIT ?1";
/// Subsequent pages of the key enumeration.
const KEYS_NEXT_PAGE_QUERY: &str =
    "SELECT key FROM cupboard WHERE key > ?1 ORDER BY key LIMIT ?2";
/// Row count.
const LEN_QUERY: &str = "SELECT COUNT(*) FROM cupboard";

// ============================================================================
// SECTION: Open
// ============================================================================

/// Opens a cupboard at `path`, creating the file and table if needed.
///
/// The path is used exactly as given; no extension is added.
///
/// # Errors
///
/// Returns [`CupboardError::UnsupportedMode`] for any mode other than
/// [`OpenMode::Create`], or a storage error when the file cannot be opened.
pub fn open(
    path: impl AsRef<Path>,
    mode: OpenMode,
    writeback: bool,
) -> Result<Cupboard, CupboardError> {
    Cupboard::open(
        CupboardConfig::new(path.as_ref()).with_mode(mode).with_writeback(writeback),
    )
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Live connection state; absent once the cupboard is closed.
#[derive(Debug)]
struct Session {
    /// Exclusively owned `SQLite` connection.
    connection: Connection,
    /// Cached mutable values, keyed by entry key. Empty unless writeback.
    cache: HashMap<String, SharedValue>,
}

impl Session {
    /// Replaces the cache entry for `key` after a read or write.
    ///
    /// A stale entry is always dropped first, so a scalar write can never
    /// leave an older mutable value cached.
    fn remember(&mut self, key: &str, shared: &SharedValue, writeback: bool) {
        self.cache.remove(key);
        if writeback && shared.try_borrow().is_ok_and(|value| value.is_mutable()) {
            self.cache.insert(key.to_string(), Rc::clone(shared));
        }
    }
}

/// `SQLite`-backed persistent mapping.
///
/// # Invariants
/// - `session` is `None` exactly when the cupboard is closed.
/// - The cache only holds keys whose latest known value is a sequence or
///   mapping, and only in writeback mode.
/// - While a key is cached, the cached cell is authoritative and the stored
///   row may lag until the next sync.
#[derive(Debug)]
pub struct Cupboard {
    /// Backing file path.
    path: PathBuf,
    /// Whether mutable values are cached and flushed on sync.
    writeback: bool,
    /// Keys fetched per enumeration page.
    keys_page_size: usize,
    /// Open connection and cache.
    session: Option<Session>,
}

impl Cupboard {
    /// Opens a cupboard from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the configuration is invalid or the
    /// database cannot be opened or initialized.
    pub fn open(config: CupboardConfig) -> Result<Self, CupboardError> {
        config.validate()?;
        ensure_parent_dir(&config.path)?;
        let connection = open_connection(&config)?;
        connection.execute_batch(CREATE_QUERY)?;
        debug!(
            path = %config.path.display(),
            writeback = config.writeback,
            journal_mode = config.journal_mode.pragma_value(),
            "cupboard opened"
        );
        Ok(Self {
            path: config.path,
            writeback: config.writeback,
            keys_page_size: config.keys_page_size,
            session: Some(Session {
                connection,
                cache: HashMap::new(),
            }),
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether writeback mode is enabled.
    #[must_use]
    pub const fn writeback(&self) -> bool {
        self.writeback
    }

    /// Returns whether the cupboard has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    /// Returns the open session.
    fn session(&self) -> Result<&Session, CupboardError> {
        self.session.as_ref().ok_or(CupboardError::Closed)
    }

    /// Returns the open session mutably.
    fn session_mut(&mut self) -> Result<&mut Session, CupboardError> {
        self.session.as_mut().ok_or(CupboardError::Closed)
    }

    /// Stores an existing shared cell under `key`.
    ///
    /// In writeback mode a mutable value keeps its identity: the cupboard
    /// caches this exact cell, so later edits through `shared` are persisted
    /// by the next sync.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError::UnsupportedValue`] when the value cannot be
    /// encoded, or [`CupboardError::ValueBorrowed`] when the cell is mutably
    /// borrowed. Nothing is written in either case.
    pub fn set_shared(&mut self, key: &str, shared: &SharedValue) -> Result<(), CupboardError> {
        validate_key(key)?;
        let writeback = self.writeback;
        let session = self.session_mut()?;
        let encoded = encode_shared(key, shared)?;
        session.connection.prepare_cached(SET_QUERY)?.execute(params![key, encoded])?;
        session.remember(key, shared, writeback);
        Ok(())
    }

    /// Returns the value for `key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] for any failure other than an absent key.
    pub fn try_get(&mut self, key: &str) -> Result<Option<SharedValue>, CupboardError> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(CupboardError::KeyNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Returns the value for `key`, storing `default` first when absent.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the lookup or the write fails.
    pub fn set_default(
        &mut self,
        key: &str,
        default: impl Into<Value>,
    ) -> Result<SharedValue, CupboardError> {
        if let Some(existing) = self.try_get(key)? {
            return Ok(existing);
        }
        let shared = share(default);
        self.set_shared(key, &shared)?;
        Ok(shared)
    }

    /// Removes `key` and returns its last value, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the lookup or the delete fails.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, CupboardError> {
        let Some(shared) = self.try_get(key)? else {
            return Ok(None);
        };
        let value = shared
            .try_borrow()
            .map_err(|_| CupboardError::ValueBorrowed(key.to_string()))?
            .clone();
        self.delete(key)?;
        Ok(Some(value))
    }

    /// Stores every entry in one transaction.
    ///
    /// All keys and values are validated and encoded before anything is
    /// written; a later entry for the same key wins.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when any entry is invalid (nothing is
    /// written) or the transaction fails.
    pub fn set_many<I, K, V>(&mut self, entries: I) -> Result<(), CupboardError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let writeback = self.writeback;
        let session = self.session_mut()?;
        let mut prepared = Vec::new();
        for (key, value) in entries {
            let key = key.into();
            validate_key(&key)?;
            let shared = share(value);
            let encoded = encode_shared(&key, &shared)?;
            prepared.push((key, encoded, shared));
        }
        let tx = session.connection.transaction()?;
        {
            let mut statement = tx.prepare_cached(SET_QUERY)?;
            for (key, encoded, _) in &prepared {
                statement.execute(params![key, encoded])?;
            }
        }
        tx.commit()?;
        for (key, _, shared) in &prepared {
            session.remember(key, shared, writeback);
        }
        debug!(entries = prepared.len(), "cupboard batch stored");
        Ok(())
    }

    /// Deletes every entry and empties the cache.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the store is closed or the delete fails.
    pub fn clear(&mut self) -> Result<(), CupboardError> {
        let session = self.session_mut()?;
        session.connection.execute(CLEAR_QUERY, [])?;
        session.cache.clear();
        Ok(())
    }

    /// Returns true when the store holds no entries.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError`] when the count fails.
    pub fn is_empty(&self) -> Result<bool, CupboardError> {
        Ok(self.size()? == 0)
    }

    /// Enumerates `(key, value)` pairs lazily, preferring cached values.
    ///
    /// # Errors
    ///
    /// Returns [`CupboardError::Closed`] when the store is closed.
    pub fn items(&self) -> Result<Items<'_>, CupboardError> {
        let session = self.session()?;
        Ok(Items {
            keys: Keys::new(&session.connection, self.keys_page_size),
            connection: &session.connection,
            cache: &session.cache,
        })
    }
}

impl MappingStore for Cupboard {
    type Keys<'a> = Keys<'a>;

    fn get(&mut self, key: &str) -> Result<SharedValue, CupboardError> {
        validate_key(key)?;
        let writeback = self.writeback;
        let session = self.session_mut()?;
        if let Some(cached) = session.cache.get(key) {
            return Ok(Rc::clone(cached));
        }
        let value = fetch_value(&session.connection, key)?
            .ok_or_else(|| CupboardError::KeyNotFound(key.to_string()))?;
        let shared = share(value);
        session.remember(key, &shared, writeback);
        Ok(shared)
    }

    fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), CupboardError> {
        self.set_shared(key, &share(value))
    }

    fn delete(&mut self, key: &str) -> Result<(), CupboardError> {
        validate_key(key)?;
        let session = self.session_mut()?;
        session.connection.prepare_cached(DELETE_QUERY)?.execute(params![key])?;
        session.cache.remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, CupboardError> {
        validate_key(key)?;
        let session = self.session()?;
        if session.cache.contains_key(key) {
            return Ok(true);
        }
        Ok(session.connection.prepare_cached(CONTAINS_QUERY)?.exists(params![key])?)
    }

    fn keys(&self) -> Result<Keys<'_>, CupboardError> {
        let session = self.session()?;
        Ok(Keys::new(&session.connection, self.keys_page_size))
    }

    fn size(&self) -> Result<usize, CupboardError> {
        let session = self.session()?;
        let count: i64 = session.connection.query_row(LEN_QUERY, [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| CupboardError::Corrupt(format!("invalid row count {count}")))
    }

    fn sync(&mut self) -> Result<(), CupboardError> {
        let session = self.session_mut()?;
        if session.cache.is_empty() {
            return Ok(());
        }
        let mut pending = Vec::with_capacity(session.cache.len());
        for (key, shared) in &session.cache {
            pending.push((key.as_str(), encode_shared(key, shared)?));
        }
        let tx = session.connection.transaction()?;
        {
            let mut statement = tx.prepare_cached(SET_QUERY)?;
            for (key, encoded) in &pending {
                statement.execute(params![key, encoded])?;
            }
        }
        tx.commit()?;
        let flushed = pending.len();
        drop(pending);
        // Callers may have replaced a cached container with a scalar in place.
        session.cache.retain(|_, shared| match shared.try_borrow() {
            Ok(value) => value.is_mutable(),
            Err(_) => true,
        });
        debug!(entries = flushed, "cupboard cache synced");
        Ok(())
    }

    fn close(&mut self) -> Result<(), CupboardError> {
        if self.session.is_none() {
            return Ok(());
        }
        let synced = match self.sync() {
            Err(CupboardError::Closed) => Ok(()),
            other => other,
        };
        let released = match self.session.take() {
            Some(session) => {
                session.connection.close().map_err(|(_, err)| CupboardError::from(err))
            }
            None => Ok(()),
        };
        debug!(path = %self.path.display(), "cupboard closed");
        synced.and(released)
    }
}

impl Drop for Cupboard {
    fn drop(&mut self) {
        if self.session.is_none() {
            return;
        }
        if let Err(err) = self.close() {
            warn!(path = %self.path.display(), error = %err, "cupboard close on drop failed");
        }
    }
}

// ============================================================================
// SECTION: Enumeration
// ============================================================================

/// Lazy key enumeration in ascending byte-wise key order.
///
/// Keys are read a page at a time using the primary-key index, so memory use
/// is bounded by the page size. The iterator borrows the cupboard, which
/// rules out interleaved mutation. A failure ends the enumeration after the
/// keys read before it have been yielded.
#[derive(Debug)]
pub struct Keys<'a> {
    /// Connection the keys are read from.
    connection: &'a Connection,
    /// Keys fetched per page.
    page_size: usize,
    /// Keys fetched but not yet yielded.
    buffer: VecDeque<String>,
    /// Last key fetched; the next page starts after it.
    after: Option<String>,
    /// Set once a short page or an error has been seen.
    exhausted: bool,
    /// Error to yield once the buffer drains.
    failure: Option<CupboardError>,
}

impl<'a> Keys<'a> {
    /// Creates an enumeration starting before the first key.
    const fn new(connection: &'a Connection, page_size: usize) -> Self {
        Self {
            connection,
            page_size,
            buffer: VecDeque::new(),
            after: None,
            exhausted: false,
            failure: None,
        }
    }

    /// Fetches the next page into the buffer.
    ///
    /// Keys read before a failing row are still buffered.
    fn fetch_page(&mut self) -> Result<(), CupboardError> {
        let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);
        let mut page = Vec::new();
        let outcome = match self.after.as_deref() {
            None => {
                let mut statement = self.connection.prepare_cached(KEYS_FIRST_PAGE_QUERY)?;
                let rows = statement.query(params![limit])?;
                collect_keys(rows, &mut page)
            }
            Some(after) => {
                let mut statement = self.connection.prepare_cached(KEYS_NEXT_PAGE_QUERY)?;
                let rows = statement.query(params![after, limit])?;
                collect_keys(rows, &mut page)
            }
        };
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.after = Some(last.clone());
        }
        self.buffer.extend(page);
        outcome
    }
}

impl Iterator for Keys<'_> {
    type Item = Result<String, CupboardError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty()
            && !self.exhausted
            && let Err(err) = self.fetch_page()
        {
            self.exhausted = true;
            self.failure = Some(err);
        }
        if let Some(key) = self.buffer.pop_front() {
            return Some(Ok(key));
        }
        self.failure.take().map(Err)
    }
}

/// Lazy `(key, value)` enumeration in key order.
///
/// Cached writeback values are reported as they currently are in memory,
/// not as last flushed.
#[derive(Debug)]
pub struct Items<'a> {
    /// Underlying key enumeration.
    keys: Keys<'a>,
    /// Connection values are read from.
    connection: &'a Connection,
    /// Writeback cache consulted before storage.
    cache: &'a HashMap<String, SharedValue>,
}

impl Items<'_> {
    /// Resolves the current value for an enumerated key.
    fn resolve(&self, key: String) -> Result<(String, Value), CupboardError> {
        if let Some(shared) = self.cache.get(&key) {
            let value = shared
                .try_borrow()
                .map_err(|_| CupboardError::ValueBorrowed(key.clone()))?
                .clone();
            return Ok((key, value));
        }
        match fetch_value(self.connection, &key)? {
            Some(value) => Ok((key, value)),
            None => Err(CupboardError::KeyNotFound(key)),
        }
    }
}

impl Iterator for Items<'_> {
    type Item = Result<(String, Value), CupboardError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.keys.next()? {
            Ok(key) => Some(self.resolve(key)),
            Err(err) => Some(Err(err)),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects keys that cannot round-trip through C-string based tools.
fn validate_key(key: &str) -> Result<(), CupboardError> {
    if key.contains('\0') {
        return Err(CupboardError::InvalidKey(format!(
            "\"{}\" contains a NUL character",
            key.escape_debug()
        )));
    }
    Ok(())
}

/// Encodes the current contents of a shared cell.
fn encode_shared(key: &str, shared: &SharedValue) -> Result<String, CupboardError> {
    let value =
        shared.try_borrow().map_err(|_| CupboardError::ValueBorrowed(key.to_string()))?;
    codec::encode(&value)
}

/// Reads and decodes the value stored under `key`.
fn fetch_value(connection: &Connection, key: &str) -> Result<Option<Value>, CupboardError> {
    let mut statement = connection.prepare_cached(GET_QUERY)?;
    let encoded: Option<String> = statement
        .query_row(params![key], |row| row.get(0))
        .optional()
        .map_err(|err| column_error(err, "value"))?;
    encoded.map(|text| codec::decode(&text)).transpose()
}

/// Drains key rows into `page`, stopping at the first unreadable row.
fn collect_keys(
    mut rows: rusqlite::Rows<'_>,
    page: &mut Vec<String>,
) -> Result<(), CupboardError> {
    while let Some(row) = rows.next()? {
        let key: String = row.get(0).map_err(|err| column_error(err, "key"))?;
        page.push(key);
    }
    Ok(())
}

/// Maps non-text cells written by other tools to cupboard errors.
fn column_error(err: rusqlite::Error, column: &str) -> CupboardError {
    match err {
        rusqlite::Error::InvalidColumnType(_, _, kind) if column == "key" => {
            CupboardError::InvalidKey(format!("stored key has non-text type {kind}"))
        }
        rusqlite::Error::InvalidColumnType(_, _, kind) => {
            CupboardError::Corrupt(format!("stored {column} has non-text type {kind}"))
        }
        other => other.into(),
    }
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), CupboardError> {
    let Some(parent) = path.parent() else {
        return Err(CupboardError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| CupboardError::Io(err.to_string()))
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &CupboardConfig) -> Result<Connection, CupboardError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    connection.execute_batch(&format!(
        "PRAGMA journal_mode = {}; PRAGMA synchronous = {};",
        config.journal_mode.pragma_value(),
        config.sync_mode.pragma_value()
    ))?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(connection)
}
