// stat-series-core/src/runtime/store.rs
// ============================================================================
// Module: Stat Series In-Memory Store
// Description: Sorted in-memory key-value store for tests and local use.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: async-trait, serde_json, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a [`KeyValueStore`] backed by a `BTreeMap`, whose
//! iteration order is true lexicographic key order. It is the reference
//! implementation for scan semantics and the store used by tests and local
//! demos; it is not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::key::RecordKey;
use crate::core::query::SortDirection;
use crate::interfaces::KeyValueStore;
use crate::interfaces::ScanEntry;
use crate::interfaces::ScanSelector;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory sorted key-value store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyValueStore {
    /// Sorted entry map protected by a mutex.
    entries: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Returns the number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the entry mutex is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock_entries()?.len())
    }

    /// Returns whether the store holds no entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the entry mutex is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock_entries()?.is_empty())
    }

    /// Locks the entry map.
    fn lock_entries(&self) -> Result<MutexGuard<'_, BTreeMap<String, Value>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("key-value store mutex poisoned".to_owned()))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn put(&self, key: &RecordKey, value: &Value) -> Result<(), StoreError> {
        self.lock_entries()?.insert(key.as_str().to_owned(), value.clone());
        Ok(())
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError> {
        Ok(self.lock_entries()?.get(key.as_str()).cloned())
    }

    async fn scan(
        &self,
        selector: &ScanSelector,
        direction: SortDirection,
        limit: Option<u64>,
    ) -> Result<Vec<ScanEntry>, StoreError> {
        let (lower, upper) = match selector {
            ScanSelector::Prefix(prefix) => {
                let upper = prefix
                    .successor()
                    .map_or(Bound::Unbounded, |bound| Bound::Excluded(bound.as_str().to_owned()));
                (Bound::Included(prefix.as_str().to_owned()), upper)
            }
            ScanSelector::Range(range) => {
                if range.from.as_str() >= range.to.as_str() {
                    return Ok(Vec::new());
                }
                (
                    Bound::Included(range.from.as_str().to_owned()),
                    Bound::Excluded(range.to.as_str().to_owned()),
                )
            }
        };
        let cap = limit.map_or(usize::MAX, |value| usize::try_from(value).unwrap_or(usize::MAX));
        let guard = self.lock_entries()?;
        let matched = guard.range::<String, _>((lower, upper));
        let entries: Vec<ScanEntry> = match direction {
            SortDirection::Ascend => {
                matched.take(cap).map(|(key, value)| scan_entry(key, value)).collect()
            }
            SortDirection::Descend => {
                matched.rev().take(cap).map(|(key, value)| scan_entry(key, value)).collect()
            }
        };
        drop(guard);
        Ok(entries)
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared key-value store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedKeyValueStore {
    /// Inner store implementation.
    inner: Arc<dyn KeyValueStore>,
}

impl SharedKeyValueStore {
    /// Wraps a key-value store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl KeyValueStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: store,
        }
    }
}

#[async_trait]
impl KeyValueStore for SharedKeyValueStore {
    async fn put(&self, key: &RecordKey, value: &Value) -> Result<(), StoreError> {
        self.inner.put(key, value).await
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError> {
        self.inner.get(key).await
    }

    async fn scan(
        &self,
        selector: &ScanSelector,
        direction: SortDirection,
        limit: Option<u64>,
    ) -> Result<Vec<ScanEntry>, StoreError> {
        self.inner.scan(selector, direction, limit).await
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a borrowed map entry into an owned scan entry.
fn scan_entry(key: &str, value: &Value) -> ScanEntry {
    ScanEntry {
        key: RecordKey::new(key),
        value: value.clone(),
    }
}
