// stat-series-config/tests/config_defaults.rs
// ============================================================================
// Module: Config Default Tests
// Description: Tests for configuration defaults and loading.
// Purpose: Validate defaulted sections and file loading behavior.
// Dependencies: stat-series-config, tempfile
// ============================================================================

//! ## Overview
//! Ensures an empty config loads with documented defaults and that loading
//! from disk enforces the size cap.

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

use std::fs;

use stat_series_config::ConfigError;
use stat_series_config::StatSeriesConfig;
use stat_series_config::StoreBackend;
use tempfile::TempDir;

/// Verifies an empty document yields the documented defaults.
#[test]
fn empty_config_uses_defaults() {
    let config = StatSeriesConfig::from_toml_str("").unwrap();
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert!(config.store.sqlite.is_none());
    assert_eq!(config.query.default_limit, 1);
    assert_eq!(config.query.max_scan_limit, 4_096);
    assert!(config.series.is_empty());
}

/// Verifies a full document round-trips into the model.
#[test]
fn full_config_parses() {
    let raw = r#"
        [store]
        backend = "sqlite"

        [store.sqlite]
        path = "/var/lib/stat-series/stats.db"
        busy_timeout_ms = 2500
        journal_mode = "wal"
        sync_mode = "normal"

        [query]
        default_limit = 5
        max_scan_limit = 500

        [[series]]
        category = "tokenStats"
        dimensions = ["tokenSymbol", "timeframe"]

        [[series]]
        category = "walletStats"
        dimensions = ["walletAddress"]
    "#;
    let config = StatSeriesConfig::from_toml_str(raw).unwrap();
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(config.query.default_limit, 5);
    assert_eq!(config.series.len(), 2);

    let layout = config.series_layout("tokenStats").unwrap().unwrap();
    assert_eq!(layout.category(), "tokenStats");
    assert_eq!(layout.dimension_names().len(), 2);
    assert!(config.series_layout("unknown").unwrap().is_none());
}

/// Verifies malformed TOML fails as a parse error.
#[test]
fn malformed_toml_fails_parse() {
    let err = StatSeriesConfig::from_toml_str("store = ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "got {err}");
}

/// Verifies loading from an explicit path works end to end.
#[test]
fn load_reads_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stat-series.toml");
    fs::write(&path, "[query]\ndefault_limit = 3\nmax_scan_limit = 30\n").unwrap();

    let config = StatSeriesConfig::load(Some(&path)).unwrap();
    assert_eq!(config.query.default_limit, 3);
    assert_eq!(config.query.max_scan_limit, 30);
}

/// Verifies a missing file fails as an I/O error.
#[test]
fn load_missing_file_fails_io() {
    let dir = TempDir::new().unwrap();
    let err = StatSeriesConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)), "got {err}");
}
