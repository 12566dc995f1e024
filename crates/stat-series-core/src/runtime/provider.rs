// stat-series-core/src/runtime/provider.rs
// ============================================================================
// Module: Stat Series Provider
// Description: Typed query operations over a sorted key-value store.
// Purpose: Insert, point-lookup, latest, iterate, and range with normalization.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! The provider builds keys through its [`SeriesLayout`], issues single
//! round trips to the configured [`KeyValueStore`], and layers defaulting
//! and validation on top of raw scans. It holds no mutable state between
//! calls and never re-sorts results client-side; sort direction and limits
//! are pushed down to the store. Records read back are verified against
//! their keys and rejected on mismatch.
//!
//! Same-millisecond inserts into one scope collide on one key and resolve
//! last-writer-wins at the store. This layer does not deduplicate or
//! serialize such writes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::key::KeyError;
use crate::core::key::KeyRange;
use crate::core::key::RecordKey;
use crate::core::key::SeriesLayout;
use crate::core::query::QueryOptions;
use crate::core::query::ScanQuery;
use crate::core::query::SortDirection;
use crate::core::query::floor_limit;
use crate::core::record::StatsPayload;
use crate::core::record::StatsRecord;
use crate::core::time::Timestamp;
use crate::interfaces::Clock;
use crate::interfaces::KeyValueStore;
use crate::interfaces::ScanEntry;
use crate::interfaces::ScanSelector;
use crate::interfaces::StoreError;
use crate::runtime::clock::SystemClock;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Provider operation errors.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Key encoding contract violation.
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    /// Mutually exclusive selectors both set, or neither set.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Point lookup or latest scan on an empty scope.
    #[error("record not found: {0}")]
    NotFound(String),
    /// Stored value failed deserialization or key consistency checks.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),
    /// Store failure, surfaced verbatim; retry policy belongs to the store
    /// client.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// A stored record together with the key it lives under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    /// Key the record is stored under.
    pub key: RecordKey,
    /// Decoded record.
    pub record: StatsRecord,
}

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Typed time-series query layer over a sorted key-value store.
///
/// One provider instance serves one [`SeriesLayout`]; layouts with different
/// dimension shapes configure separate instances of this same type rather
/// than separate implementations. The provider is logically a stateless
/// function bundle parameterized by the store handle and clock.
#[derive(Debug, Clone)]
pub struct SeriesStatsProvider<S, C = SystemClock> {
    /// Sorted key-value store handle.
    store: S,
    /// Key shape served by this provider.
    layout: SeriesLayout,
    /// Time source for defaulted insert timestamps.
    clock: C,
}

impl<S: KeyValueStore> SeriesStatsProvider<S, SystemClock> {
    /// Creates a provider using the system clock.
    #[must_use]
    pub fn new(store: S, layout: SeriesLayout) -> Self {
        Self::with_clock(store, layout, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> SeriesStatsProvider<S, C> {
    /// Creates a provider with an explicit clock.
    #[must_use]
    pub const fn with_clock(store: S, layout: SeriesLayout, clock: C) -> Self {
        Self {
            store,
            layout,
            clock,
        }
    }

    /// Returns the layout served by this provider.
    #[must_use]
    pub const fn layout(&self) -> &SeriesLayout {
        &self.layout
    }

    /// Stores a record under `category/<dimensions>/<timestamp>`, defaulting a
    /// missing timestamp from the clock. Returns the final key and stored
    /// record. One `put`; no retry.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Key`] on encoding violations and
    /// [`QueryError::Store`] when the write fails.
    pub async fn insert(
        &self,
        dimensions: &[&str],
        payload: StatsPayload,
    ) -> Result<StoredEntry, QueryError> {
        let timestamp = payload.timestamp.unwrap_or_else(|| self.clock.now());
        let key = self.layout.encode(dimensions, timestamp)?;
        let record = payload.into_record(timestamp);
        let value =
            record.to_value().map_err(|err| QueryError::InvalidRecord(err.to_string()))?;
        self.store.put(&key, &value).await?;
        Ok(StoredEntry {
            key,
            record,
        })
    }

    /// Loads the record stored under a key.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotFound`] when nothing is stored under the
    /// key, [`QueryError::Key`] when the key does not decode under this
    /// provider's layout, and [`QueryError::InvalidRecord`] when the stored
    /// value contradicts its key.
    pub async fn get_by_key(&self, key: &RecordKey) -> Result<StatsRecord, QueryError> {
        let decoded = self.layout.decode(key)?;
        let value = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("no record stored under key {key}")))?;
        decode_record(key, decoded.timestamp, value)
    }

    /// Returns the single newest record in a scope, by descending key order
    /// with a limit of one pushed down to the store.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotFound`] when the scope holds no records.
    pub async fn get_latest(&self, dimensions: &[&str]) -> Result<StatsRecord, QueryError> {
        let prefix = self.layout.prefix(dimensions)?;
        let entries = self
            .store
            .scan(&ScanSelector::Prefix(prefix.clone()), SortDirection::Descend, Some(1))
            .await?;
        let Some(entry) = entries.into_iter().next() else {
            return Err(QueryError::NotFound(format!("no records under prefix {prefix}")));
        };
        self.decode_entry(entry).map(|stored| stored.record)
    }

    /// Returns records in a scope in the requested order. The limit is
    /// normalized to at least one, and an omitted limit means one; callers
    /// needing more history must say so explicitly. This is a bounded bulk
    /// read, not a streaming cursor.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Key`] on scope violations and
    /// [`QueryError::Store`] when the scan fails.
    pub async fn iterate_from_latest(
        &self,
        dimensions: &[&str],
        options: QueryOptions,
    ) -> Result<Vec<StatsRecord>, QueryError> {
        let prefix = self.layout.prefix(dimensions)?;
        let stored = self
            .scan(ScanQuery {
                prefix: Some(prefix),
                range: None,
                sort: options.sort,
                limit: Some(options.limit.unwrap_or(1)),
            })
            .await?;
        Ok(stored.into_iter().map(|entry| entry.record).collect())
    }

    /// Returns records within an explicit `[from, to)` key range in the
    /// requested order. A supplied limit is floored at one; an omitted limit
    /// leaves the scan unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Store`] when the scan fails and
    /// [`QueryError::Key`] when a returned key does not decode under this
    /// provider's layout.
    pub async fn range(
        &self,
        range: KeyRange,
        options: QueryOptions,
    ) -> Result<Vec<StatsRecord>, QueryError> {
        let stored = self
            .scan(ScanQuery {
                prefix: None,
                range: Some(range),
                sort: options.sort,
                limit: options.limit,
            })
            .await?;
        Ok(stored.into_iter().map(|entry| entry.record).collect())
    }

    /// Runs a raw scan query. Exactly one of `prefix` or `range` must be
    /// set; violations fail before any store access.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidQuery`] on selector misuse,
    /// [`QueryError::Store`] when the scan fails, and
    /// [`QueryError::Key`]/[`QueryError::InvalidRecord`] when returned
    /// entries fail decoding or key consistency checks.
    pub async fn scan(&self, query: ScanQuery) -> Result<Vec<StoredEntry>, QueryError> {
        let selector = match (query.prefix, query.range) {
            (Some(_), Some(_)) => {
                return Err(QueryError::InvalidQuery(
                    "prefix and range selectors are mutually exclusive".to_owned(),
                ));
            }
            (None, None) => {
                return Err(QueryError::InvalidQuery(
                    "a scan requires a prefix or a range selector".to_owned(),
                ));
            }
            (Some(prefix), None) => ScanSelector::Prefix(prefix),
            (None, Some(range)) => ScanSelector::Range(range),
        };
        let direction = query.sort.unwrap_or_default();
        let limit = query.limit.map(floor_limit);
        let entries = self.store.scan(&selector, direction, limit).await?;
        entries.into_iter().map(|entry| self.decode_entry(entry)).collect()
    }

    /// Decodes a scan entry and verifies the value against its key.
    fn decode_entry(&self, entry: ScanEntry) -> Result<StoredEntry, QueryError> {
        let decoded = self.layout.decode(&entry.key)?;
        decode_record(&entry.key, decoded.timestamp, entry.value).map(|record| StoredEntry {
            key: entry.key,
            record,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Deserializes a stored value and verifies its timestamp matches the key.
fn decode_record(
    key: &RecordKey,
    key_timestamp: Timestamp,
    value: Value,
) -> Result<StatsRecord, QueryError> {
    let record =
        StatsRecord::from_value(value).map_err(|err| QueryError::InvalidRecord(format!(
            "value under key {key} does not deserialize: {err}"
        )))?;
    if record.timestamp != key_timestamp {
        return Err(QueryError::InvalidRecord(format!(
            "timestamp mismatch between key {key} and stored payload {}",
            record.timestamp
        )));
    }
    Ok(record)
}
