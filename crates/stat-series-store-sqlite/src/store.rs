// stat-series-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Key-Value Store
// Description: Durable sorted KeyValueStore backed by SQLite.
// Purpose: Persist record values as verified canonical JSON snapshots.
// Dependencies: stat-series-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements the sorted [`KeyValueStore`] contract on SQLite.
//! Each put writes the RFC 8785 canonical JSON form of the value next to a
//! content hash; reads verify the hash and fail closed on mismatch. Scans
//! compile to indexed key-range queries with `ORDER BY` and `LIMIT` so
//! ordering and capping happen inside the engine, never in Rust.
//!
//! Security posture: database contents are untrusted and verified on read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value;
use stat_series_core::HashAlgorithm;
use stat_series_core::KeyValueStore;
use stat_series_core::RecordKey;
use stat_series_core::ScanEntry;
use stat_series_core::ScanSelector;
use stat_series_core::SortDirection;
use stat_series_core::StoreError;
use stat_series_core::hashing::DEFAULT_HASH_ALGORITHM;
use stat_series_core::hashing::canonical_json_bytes;
use stat_series_core::hashing::hash_bytes;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` key-value store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config with default tuning for the given database path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored snapshot failed hash verification.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) | SqliteStoreError::Db(message) => {
                Self::Unavailable(message)
            }
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) | SqliteStoreError::Invalid(message) => {
                Self::Invalid(message)
            }
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed sorted key-value store with WAL support.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteKeyValueStore {
    /// Opens an `SQLite`-backed key-value store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized, or when an existing schema version is unsupported.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock_connection(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_owned()))
    }

    /// Writes one verified snapshot under the key, replacing any prior one.
    fn put_value(&self, key: &RecordKey, value: &Value) -> Result<(), SqliteStoreError> {
        let canonical = canonical_json_bytes(value)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &canonical);
        let inserted_at = unix_millis();
        let guard = self.lock_connection()?;
        guard
            .execute(
                "INSERT INTO records (record_key, value_json, value_hash, hash_algorithm, \
                 inserted_at) VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(record_key) DO UPDATE SET \
                 value_json = excluded.value_json, value_hash = excluded.value_hash, \
                 hash_algorithm = excluded.hash_algorithm, inserted_at = excluded.inserted_at",
                params![
                    key.as_str(),
                    canonical,
                    digest.value,
                    digest.algorithm.label(),
                    inserted_at
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }

    /// Loads and verifies the snapshot stored under the key, if any.
    fn get_value(&self, key: &RecordKey) -> Result<Option<Value>, SqliteStoreError> {
        let row = {
            let guard = self.lock_connection()?;
            guard
                .query_row(
                    "SELECT value_json, value_hash, hash_algorithm FROM records WHERE \
                     record_key = ?1",
                    params![key.as_str()],
                    |row| {
                        let bytes: Vec<u8> = row.get(0)?;
                        let hash: String = row.get(1)?;
                        let algorithm: String = row.get(2)?;
                        Ok((bytes, hash, algorithm))
                    },
                )
                .optional()
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?
        };
        let Some((bytes, hash, algorithm)) = row else {
            return Ok(None);
        };
        decode_snapshot(key.as_str(), &bytes, &hash, &algorithm).map(Some)
    }

    /// Runs a bounded ordered scan and verifies every returned snapshot.
    fn scan_values(
        &self,
        selector: &ScanSelector,
        direction: SortDirection,
        limit: Option<u64>,
    ) -> Result<Vec<ScanEntry>, SqliteStoreError> {
        let Some(bounds) = scan_bounds(selector) else {
            return Ok(Vec::new());
        };
        let sql = scan_sql(&bounds, direction, limit);
        let rows = {
            let guard = self.lock_connection()?;
            let mut statement =
                guard.prepare(&sql).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let map_row = |row: &rusqlite::Row<'_>| {
                let key: String = row.get(0)?;
                let bytes: Vec<u8> = row.get(1)?;
                let hash: String = row.get(2)?;
                let algorithm: String = row.get(3)?;
                Ok((key, bytes, hash, algorithm))
            };
            let collected: Result<Vec<_>, rusqlite::Error> = match &bounds.upper {
                Some(upper) => statement
                    .query_map(params![bounds.lower, upper], map_row)
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?
                    .collect(),
                None => statement
                    .query_map(params![bounds.lower], map_row)
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?
                    .collect(),
            };
            collected.map_err(|err| SqliteStoreError::Db(err.to_string()))?
        };
        let mut entries = Vec::with_capacity(rows.len());
        for (key, bytes, hash, algorithm) in rows {
            let value = decode_snapshot(&key, &bytes, &hash, &algorithm)?;
            entries.push(ScanEntry {
                key: RecordKey::new(key),
                value,
            });
        }
        Ok(entries)
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn put(&self, key: &RecordKey, value: &Value) -> Result<(), StoreError> {
        self.put_value(key, value).map_err(StoreError::from)
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError> {
        self.get_value(key).map_err(StoreError::from)
    }

    async fn scan(
        &self,
        selector: &ScanSelector,
        direction: SortDirection,
        limit: Option<u64>,
    ) -> Result<Vec<ScanEntry>, StoreError> {
        self.scan_values(selector, direction, limit).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Scan Compilation
// ============================================================================

/// Key bounds for one scan: inclusive lower, optional exclusive upper.
struct ScanBounds {
    /// Inclusive lower key bound.
    lower: String,
    /// Exclusive upper key bound; `None` scans to the end of the keyspace.
    upper: Option<String>,
}

/// Resolves selector bounds; `None` means the scan matches nothing.
fn scan_bounds(selector: &ScanSelector) -> Option<ScanBounds> {
    match selector {
        ScanSelector::Prefix(prefix) => Some(ScanBounds {
            lower: prefix.as_str().to_owned(),
            upper: prefix.successor().map(|bound| bound.as_str().to_owned()),
        }),
        ScanSelector::Range(range) => {
            if range.from.as_str() >= range.to.as_str() {
                return None;
            }
            Some(ScanBounds {
                lower: range.from.as_str().to_owned(),
                upper: Some(range.to.as_str().to_owned()),
            })
        }
    }
}

/// Builds the scan statement with ordering and limit pushed down.
fn scan_sql(bounds: &ScanBounds, direction: SortDirection, limit: Option<u64>) -> String {
    let mut sql = String::from(
        "SELECT record_key, value_json, value_hash, hash_algorithm FROM records WHERE \
         record_key >= ?1",
    );
    if bounds.upper.is_some() {
        sql.push_str(" AND record_key < ?2");
    }
    sql.push_str(" ORDER BY record_key ");
    sql.push_str(match direction {
        SortDirection::Ascend => "ASC",
        SortDirection::Descend => "DESC",
    });
    if let Some(limit) = limit {
        let capped = i64::try_from(limit).unwrap_or(i64::MAX);
        sql.push_str(&format!(" LIMIT {capped}"));
    }
    sql
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Verifies a stored snapshot's hash and deserializes it.
fn decode_snapshot(
    key: &str,
    bytes: &[u8],
    stored_hash: &str,
    algorithm_label: &str,
) -> Result<Value, SqliteStoreError> {
    let algorithm = parse_hash_algorithm(algorithm_label)?;
    let expected = hash_bytes(algorithm, bytes);
    if expected.value != stored_hash {
        return Err(SqliteStoreError::Corrupt(format!("hash mismatch for key {key}")));
    }
    serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_owned()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_owned()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_owned(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_owned(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates an existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS records (
                    record_key TEXT PRIMARY KEY,
                    value_json BLOB NOT NULL,
                    value_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    inserted_at INTEGER NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Parses a stored hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    HashAlgorithm::from_label(label)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unsupported hash algorithm: {label}")))
}
