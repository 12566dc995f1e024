// stat-series-core/tests/time.rs
// ============================================================================
// Module: Canonical Timestamp Tests
// Description: Tests for canonical timestamp parsing and formatting.
// Purpose: Validate strict parsing and fixed-width formatting invariants.
// Dependencies: stat-series-core
// ============================================================================

//! ## Overview
//! Ensures timestamps round-trip through their canonical string form,
//! non-canonical inputs are rejected, and millisecond truncation and year
//! bounds hold.

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

use stat_series_core::Timestamp;
use stat_series_core::TimestampError;

/// Verifies parsing and formatting round-trip canonically.
#[test]
fn parse_and_format_round_trip() {
    let raw = "2024-01-02T03:04:05.678Z";
    let timestamp = Timestamp::parse(raw).unwrap();
    assert_eq!(timestamp.to_canonical_string().unwrap(), raw);
    assert_eq!(timestamp.to_string(), raw);
}

/// Verifies sub-second padding is preserved at every width.
#[test]
fn formats_are_fixed_width() {
    let midnight = Timestamp::parse("2024-01-01T00:00:00.000Z").unwrap();
    assert_eq!(midnight.to_canonical_string().unwrap().len(), 24);

    let early_year = Timestamp::parse("0042-01-01T00:00:00.007Z").unwrap();
    assert_eq!(early_year.to_canonical_string().unwrap(), "0042-01-01T00:00:00.007Z");
}

/// Verifies non-canonical inputs are rejected.
#[test]
fn parse_rejects_non_canonical_forms() {
    for raw in [
        "2024-01-02T03:04:05Z",
        "2024-01-02T03:04:05.6789Z",
        "2024-01-02 03:04:05.678Z",
        "2024-01-02T03:04:05.678+00:00",
        "2024-1-02T03:04:05.678Z",
        "2024-01-02T03:04:05.678Zx",
        "not-a-timestamp",
        "",
    ] {
        let err = Timestamp::parse(raw).unwrap_err();
        assert!(matches!(err, TimestampError::Format(_)), "{raw} parsed unexpectedly");
    }
}

/// Verifies construction truncates to millisecond precision.
#[test]
fn from_unix_millis_truncates_and_round_trips() {
    let timestamp = Timestamp::from_unix_millis(1_704_164_645_678).unwrap();
    assert_eq!(timestamp.to_canonical_string().unwrap(), "2024-01-02T03:04:05.678Z");

    let reparsed = Timestamp::parse("2024-01-02T03:04:05.678Z").unwrap();
    assert_eq!(timestamp, reparsed);
}

/// Verifies instants outside the fixed-width year range are rejected.
#[test]
fn out_of_range_years_are_rejected() {
    // 10000-01-01T00:00:00Z in unix milliseconds.
    let err = Timestamp::from_unix_millis(253_402_300_800_000).unwrap_err();
    assert!(matches!(err, TimestampError::OutOfRange(_)), "got {err}");

    // One millisecond before 0000-01-01T00:00:00Z.
    let err = Timestamp::from_unix_millis(-62_167_219_200_001).unwrap_err();
    assert!(matches!(err, TimestampError::OutOfRange(_)), "got {err}");
}

/// Verifies timestamp ordering matches canonical string ordering.
#[test]
fn ordering_matches_canonical_string_ordering() {
    let earlier = Timestamp::parse("2024-01-02T03:04:05.678Z").unwrap();
    let later = Timestamp::parse("2024-01-02T03:04:06.000Z").unwrap();
    assert!(earlier < later);
    assert!(
        earlier.to_canonical_string().unwrap() < later.to_canonical_string().unwrap()
    );
}

/// Verifies the serde form is the canonical string.
#[test]
fn serde_uses_canonical_string_form() {
    let timestamp = Timestamp::parse("2024-01-02T03:04:05.678Z").unwrap();
    let json = serde_json::to_string(&timestamp).unwrap();
    assert_eq!(json, "\"2024-01-02T03:04:05.678Z\"");

    let back: Timestamp = serde_json::from_str(&json).unwrap();
    assert_eq!(back, timestamp);
}
