// stat-series-core/src/interfaces/mod.rs
// ============================================================================
// Module: Stat Series Interfaces
// Description: Backend-agnostic store and clock contracts.
// Purpose: Define the surfaces the provider consumes without backend detail.
// Dependencies: async-trait, serde_json, crate::core
// ============================================================================

//! ## Overview
//! The provider is parameterized by a sorted key-value store and a clock.
//! Store implementations must return scan results in true key order for the
//! requested direction and must not retry internally; retry, timeout, and
//! consistency policy belong to the store client, not this layer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::key::KeyPrefix;
use crate::core::key::KeyRange;
use crate::core::key::RecordKey;
use crate::core::query::SortDirection;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Key-value store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport or engine failure; surfaced verbatim, never retried here.
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
    /// Stored data failed integrity verification.
    #[error("key-value store corruption: {0}")]
    Corrupt(String),
    /// Stored data is malformed.
    #[error("key-value store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Scan Contract
// ============================================================================

/// Scan scope: a shared key prefix or an explicit `[from, to)` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanSelector {
    /// All keys sharing the prefix.
    Prefix(KeyPrefix),
    /// All keys within the range, `from` inclusive and `to` exclusive.
    Range(KeyRange),
}

/// One key-value pair returned by a scan, in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    /// Record key.
    pub key: RecordKey,
    /// Stored value.
    pub value: Value,
}

// ============================================================================
// SECTION: Key-Value Store
// ============================================================================

/// Sorted key-value store consumed by the provider.
///
/// Implementations guarantee read-your-writes consistency on a single key
/// and return scan results in true lexicographic key order for the requested
/// direction, capped at `limit` entries when one is given.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Stores a value under a key, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    async fn put(&self, key: &RecordKey, value: &Value) -> Result<(), StoreError>;

    /// Loads the value stored under a key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError>;

    /// Returns the key-value pairs matched by the selector, ordered by key
    /// in the requested direction, capped at `limit` entries when given.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the scan fails.
    async fn scan(
        &self,
        selector: &ScanSelector,
        direction: SortDirection,
        limit: Option<u64>,
    ) -> Result<Vec<ScanEntry>, StoreError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source for defaulted insert timestamps.
///
/// The clock is an explicit constructor parameter of the provider rather
/// than an ambient global, so deterministic clocks can stand in during
/// tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Timestamp;
}
