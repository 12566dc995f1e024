// stat-series-core/tests/provider.rs
// ============================================================================
// Module: Series Stats Provider Tests
// Description: Tests for insert, lookup, latest, iterate, and range queries.
// Purpose: Validate defaulting, limit normalization, and fail-closed reads.
// Dependencies: stat-series-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! Exercises the provider against the in-memory store with a fixed clock:
//! timestamp defaulting, latest selection, limit floors, selector
//! exclusivity, and verification of stored values against their keys.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use stat_series_core::FixedClock;
use stat_series_core::InMemoryKeyValueStore;
use stat_series_core::KeyRange;
use stat_series_core::KeyValueStore;
use stat_series_core::QueryError;
use stat_series_core::QueryOptions;
use stat_series_core::RecordKey;
use stat_series_core::ScanEntry;
use stat_series_core::ScanQuery;
use stat_series_core::ScanSelector;
use stat_series_core::SeriesLayout;
use stat_series_core::SeriesStatsProvider;
use stat_series_core::SortDirection;
use stat_series_core::StatsPayload;
use stat_series_core::StoreError;
use stat_series_core::Timestamp;

/// Returns the token statistics layout used across these tests.
fn token_stats_layout() -> SeriesLayout {
    SeriesLayout::new("tokenStats", vec!["tokenSymbol".to_owned(), "timeframe".to_owned()])
        .unwrap()
}

/// Builds a provider over a fresh in-memory store pinned to the instant.
fn provider_at(
    instant: &str,
) -> SeriesStatsProvider<InMemoryKeyValueStore, FixedClock> {
    let clock = FixedClock::new(Timestamp::parse(instant).unwrap());
    SeriesStatsProvider::with_clock(InMemoryKeyValueStore::new(), token_stats_layout(), clock)
}

/// Extracts the object map from a JSON literal.
fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object literal, got {other}"),
    }
}

/// Store double that counts accesses and serves nothing.
#[derive(Debug, Default, Clone)]
struct ProbeStore {
    /// Shared count of store calls of any kind.
    accesses: Arc<AtomicUsize>,
}

impl ProbeStore {
    /// Returns the number of store calls observed.
    fn access_count(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for ProbeStore {
    async fn put(&self, _key: &RecordKey, _value: &Value) -> Result<(), StoreError> {
        self.accesses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, _key: &RecordKey) -> Result<Option<Value>, StoreError> {
        self.accesses.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    async fn scan(
        &self,
        _selector: &ScanSelector,
        _direction: SortDirection,
        _limit: Option<u64>,
    ) -> Result<Vec<ScanEntry>, StoreError> {
        self.accesses.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Verifies insert defaults a missing timestamp from the clock and returns
/// the final key and stored record.
#[tokio::test]
async fn insert_defaults_timestamp_from_clock() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    let payload = StatsPayload::new(fields(json!({
        "tokenSymbol": "SOL",
        "timeframe": "1h",
        "value": 100,
    })));

    let stored = provider.insert(&["SOL", "1h"], payload).await.unwrap();
    assert_eq!(stored.key.as_str(), "tokenStats/SOL/1h/2024-01-01T00:00:00.000Z");
    assert_eq!(
        stored.record.timestamp,
        Timestamp::parse("2024-01-01T00:00:00.000Z").unwrap()
    );
    assert_eq!(stored.record.fields.get("value"), Some(&json!(100)));

    let loaded = provider.get_by_key(&stored.key).await.unwrap();
    assert_eq!(loaded, stored.record);
}

/// Verifies an explicit payload timestamp wins over the clock.
#[tokio::test]
async fn insert_keeps_explicit_timestamp() {
    let provider = provider_at("2024-06-01T00:00:00.000Z");
    let explicit = Timestamp::parse("2024-01-02T03:04:05.678Z").unwrap();
    let payload = StatsPayload::with_timestamp(explicit, fields(json!({"value": 7})));

    let stored = provider.insert(&["SOL", "1h"], payload).await.unwrap();
    assert_eq!(stored.key.as_str(), "tokenStats/SOL/1h/2024-01-02T03:04:05.678Z");
    assert_eq!(stored.record.timestamp, explicit);
}

/// Verifies get_by_key on a key never written fails with NotFound.
#[tokio::test]
async fn get_by_key_missing_fails_not_found() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    let key = RecordKey::new("tokenStats/SOL/1h/2024-01-01T00:00:00.000Z");

    let err = provider.get_by_key(&key).await.unwrap_err();
    assert!(matches!(err, QueryError::NotFound(_)), "got {err}");
}

/// Verifies get_latest returns exactly the maximum-timestamp record.
#[tokio::test]
async fn get_latest_returns_newest_record() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    for (instant, value) in [
        ("2024-01-01T00:00:00.000Z", 1),
        ("2024-01-03T00:00:00.000Z", 3),
        ("2024-01-02T00:00:00.000Z", 2),
    ] {
        let timestamp = Timestamp::parse(instant).unwrap();
        let payload = StatsPayload::with_timestamp(timestamp, fields(json!({"value": value})));
        provider.insert(&["SOL", "1h"], payload).await.unwrap();
    }

    let latest = provider.get_latest(&["SOL", "1h"]).await.unwrap();
    assert_eq!(latest.fields.get("value"), Some(&json!(3)));
}

/// Verifies get_latest on an empty scope fails with NotFound.
#[tokio::test]
async fn get_latest_empty_scope_fails_not_found() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    let err = provider.get_latest(&["SOL", "1h"]).await.unwrap_err();
    assert!(matches!(err, QueryError::NotFound(_)), "got {err}");
}

/// Seeds three records at strictly increasing timestamps.
async fn seed_three(
    provider: &SeriesStatsProvider<InMemoryKeyValueStore, FixedClock>,
) -> Vec<Timestamp> {
    let mut timestamps = Vec::new();
    for (instant, value) in [
        ("2024-01-01T00:00:00.000Z", 1),
        ("2024-01-02T00:00:00.000Z", 2),
        ("2024-01-03T00:00:00.000Z", 3),
    ] {
        let timestamp = Timestamp::parse(instant).unwrap();
        let payload = StatsPayload::with_timestamp(timestamp, fields(json!({"value": value})));
        provider.insert(&["SOL", "1h"], payload).await.unwrap();
        timestamps.push(timestamp);
    }
    timestamps
}

/// Verifies iterate_from_latest with a limit of two returns the two newest
/// records, newest first.
#[tokio::test]
async fn iterate_from_latest_returns_newest_first() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    let timestamps = seed_three(&provider).await;

    let records = provider
        .iterate_from_latest(&["SOL", "1h"], QueryOptions::with_limit(2))
        .await
        .unwrap();
    let got: Vec<Timestamp> = records.iter().map(|record| record.timestamp).collect();
    assert_eq!(got, vec![timestamps[2], timestamps[1]]);
}

/// Verifies an omitted limit falls back to the floor of one.
#[tokio::test]
async fn iterate_from_latest_defaults_to_one() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    let timestamps = seed_three(&provider).await;

    let records = provider
        .iterate_from_latest(&["SOL", "1h"], QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].timestamp, timestamps[2]);
}

/// Verifies zero and negative limits behave identically to a limit of one.
#[tokio::test]
async fn iterate_from_latest_floors_non_positive_limits() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    let timestamps = seed_three(&provider).await;

    for limit in [0, -5] {
        let records = provider
            .iterate_from_latest(&["SOL", "1h"], QueryOptions::with_limit(limit))
            .await
            .unwrap();
        assert_eq!(records.len(), 1, "limit {limit}");
        assert_eq!(records[0].timestamp, timestamps[2], "limit {limit}");
    }
}

/// Verifies an ascending sort override is honored end to end.
#[tokio::test]
async fn iterate_from_latest_honors_ascending_sort() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    let timestamps = seed_three(&provider).await;

    let records = provider
        .iterate_from_latest(&["SOL", "1h"], QueryOptions {
            sort: Some(SortDirection::Ascend),
            limit: Some(2),
        })
        .await
        .unwrap();
    let got: Vec<Timestamp> = records.iter().map(|record| record.timestamp).collect();
    assert_eq!(got, vec![timestamps[0], timestamps[1]]);
}

/// Verifies a partial scope reaches every series under the leading
/// dimensions.
#[tokio::test]
async fn iterate_from_latest_accepts_partial_scope() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    seed_three(&provider).await;
    let other = Timestamp::parse("2024-02-01T00:00:00.000Z").unwrap();
    provider
        .insert(
            &["SOL", "4h"],
            StatsPayload::with_timestamp(other, fields(json!({"value": 4}))),
        )
        .await
        .unwrap();

    let records = provider
        .iterate_from_latest(&["SOL"], QueryOptions::with_limit(10))
        .await
        .unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].timestamp, other);
}

/// Verifies range scans are half-open and unbounded without a limit.
#[tokio::test]
async fn range_is_half_open_and_unbounded_by_default() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    let timestamps = seed_three(&provider).await;

    let range = KeyRange::new(
        "tokenStats/SOL/1h/2024-01-01T00:00:00.000Z",
        "tokenStats/SOL/1h/2024-01-03T00:00:00.000Z",
    );
    let records = provider.range(range, QueryOptions::default()).await.unwrap();
    let got: Vec<Timestamp> = records.iter().map(|record| record.timestamp).collect();
    assert_eq!(got, vec![timestamps[1], timestamps[0]]);
}

/// Verifies a supplied range limit is floored at one.
#[tokio::test]
async fn range_floors_supplied_limit() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    let timestamps = seed_three(&provider).await;

    let range = KeyRange::new("tokenStats/SOL/1h/", "tokenStats/SOL/1h0");
    let records = provider.range(range, QueryOptions::with_limit(0)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].timestamp, timestamps[2]);
}

/// Verifies supplying both selectors fails without touching the store.
#[tokio::test]
async fn scan_rejects_both_selectors_without_store_access() {
    let probe = ProbeStore::default();
    let provider = SeriesStatsProvider::with_clock(
        probe.clone(),
        token_stats_layout(),
        FixedClock::new(Timestamp::parse("2024-01-01T00:00:00.000Z").unwrap()),
    );

    let err = provider
        .scan(ScanQuery {
            prefix: Some(provider.layout().prefix(&["SOL", "1h"]).unwrap()),
            range: Some(KeyRange::new("a", "b")),
            sort: None,
            limit: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidQuery(_)), "got {err}");
    assert_eq!(probe.access_count(), 0);
}

/// Verifies supplying neither selector fails without touching the store.
#[tokio::test]
async fn scan_rejects_missing_selector_without_store_access() {
    let probe = ProbeStore::default();
    let provider = SeriesStatsProvider::with_clock(
        probe.clone(),
        token_stats_layout(),
        FixedClock::new(Timestamp::parse("2024-01-01T00:00:00.000Z").unwrap()),
    );

    let err = provider.scan(ScanQuery::default()).await.unwrap_err();
    assert!(matches!(err, QueryError::InvalidQuery(_)), "got {err}");
    assert_eq!(probe.access_count(), 0);
}

/// Verifies a stored value contradicting its key fails closed on read.
#[tokio::test]
async fn read_rejects_timestamp_mismatch() {
    let store = InMemoryKeyValueStore::new();
    let key = RecordKey::new("tokenStats/SOL/1h/2024-01-01T00:00:00.000Z");
    store
        .put(&key, &json!({"timestamp": "2024-06-01T00:00:00.000Z", "value": 1}))
        .await
        .unwrap();

    let provider = SeriesStatsProvider::new(store, token_stats_layout());
    let err = provider.get_by_key(&key).await.unwrap_err();
    assert!(matches!(err, QueryError::InvalidRecord(_)), "got {err}");
}

/// Verifies a key outside the provider's layout is rejected before access.
#[tokio::test]
async fn get_by_key_rejects_foreign_layout_key() {
    let provider = provider_at("2024-01-01T00:00:00.000Z");
    let err = provider
        .get_by_key(&RecordKey::new("walletStats/abc/2024-01-01T00:00:00.000Z"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Key(_)), "got {err}");
}
