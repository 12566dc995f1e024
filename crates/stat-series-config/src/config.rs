// stat-series-config/src/config.rs
// ============================================================================
// Module: Stat Series Configuration
// Description: Configuration loading and validation for the stats layer.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: stat-series-core, stat-series-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits and
//! cross-field validation. Declared series layouts are built through the
//! core codec so the config cannot admit categories or dimension names the
//! key encoder would reject. Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use stat_series_core::InMemoryKeyValueStore;
use stat_series_core::SeriesLayout;
use stat_series_core::SharedKeyValueStore;
use stat_series_store_sqlite::SqliteKeyValueStore;
use stat_series_store_sqlite::SqliteStoreConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "stat-series.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "STAT_SERIES_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Default result cap applied when callers omit a limit.
pub(crate) const DEFAULT_QUERY_LIMIT: i64 = 1;
/// Default upper bound embedders enforce on caller-supplied limits.
pub(crate) const DEFAULT_MAX_SCAN_LIMIT: i64 = 4_096;
/// Hard ceiling for the configured scan limit bound.
pub(crate) const MAX_SCAN_LIMIT_CEILING: i64 = 65_536;
/// Maximum number of declared series.
pub(crate) const MAX_SERIES_ENTRIES: usize = 256;
/// Maximum dimensions allowed per declared series.
pub(crate) const MAX_SERIES_DIMENSIONS: usize = 16;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file could not be parsed as TOML.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config contents failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Configured store backend could not be opened.
    #[error("config store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Stat series configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StatSeriesConfig {
    /// Store backend configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Query limit defaults and bounds.
    #[serde(default)]
    pub query: QueryConfig,
    /// Declared series layouts.
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
}

/// Store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-memory store; contents do not survive the process.
    #[default]
    Memory,
    /// Durable SQLite-backed store.
    Sqlite,
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StoreConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite settings; required when the backend is `sqlite`.
    #[serde(default)]
    pub sqlite: Option<SqliteStoreConfig>,
}

impl StoreConfig {
    /// Opens the configured store backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on inconsistent backend settings and
    /// [`ConfigError::Store`] when the backend fails to open.
    pub fn open(&self) -> Result<SharedKeyValueStore, ConfigError> {
        match (self.backend, self.sqlite.as_ref()) {
            (StoreBackend::Memory, None) => {
                Ok(SharedKeyValueStore::from_store(InMemoryKeyValueStore::new()))
            }
            (StoreBackend::Sqlite, Some(sqlite)) => SqliteKeyValueStore::new(sqlite)
                .map(SharedKeyValueStore::from_store)
                .map_err(|err| ConfigError::Store(err.to_string())),
            (StoreBackend::Sqlite, None) => Err(ConfigError::Invalid(
                "store.backend = \"sqlite\" requires a [store.sqlite] section".to_owned(),
            )),
            (StoreBackend::Memory, Some(_)) => Err(ConfigError::Invalid(
                "store.sqlite is set but store.backend is \"memory\"".to_owned(),
            )),
        }
    }
}

/// Query limit defaults and bounds for embedding applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueryConfig {
    /// Result cap applied when callers omit a limit; floored at one.
    #[serde(default = "default_query_limit")]
    pub default_limit: i64,
    /// Upper bound embedders enforce on caller-supplied limits.
    #[serde(default = "default_max_scan_limit")]
    pub max_scan_limit: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_QUERY_LIMIT,
            max_scan_limit: DEFAULT_MAX_SCAN_LIMIT,
        }
    }
}

/// One declared series layout.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesConfig {
    /// Category segment leading every key of the series.
    pub category: String,
    /// Ordered dimension names.
    #[serde(default)]
    pub dimensions: Vec<String>,
}

impl SeriesConfig {
    /// Builds the validated layout for this series.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the category or a dimension
    /// name is not a valid key segment.
    pub fn layout(&self) -> Result<SeriesLayout, ConfigError> {
        SeriesLayout::new(self.category.clone(), self.dimensions.clone())
            .map_err(|err| ConfigError::Invalid(format!("series {}: {err}", self.category)))
    }
}

/// Returns the default query limit.
const fn default_query_limit() -> i64 {
    DEFAULT_QUERY_LIMIT
}

/// Returns the default scan limit bound.
const fn default_max_scan_limit() -> i64 {
    DEFAULT_MAX_SCAN_LIMIT
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl StatSeriesConfig {
    /// Loads and validates configuration.
    ///
    /// The path is resolved in order: the explicit argument, the
    /// `STAT_SERIES_CONFIG` environment variable, then `stat-series.toml`
    /// in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is missing, oversized,
    /// unparsable, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved: PathBuf = match path {
            Some(explicit) => explicit.to_path_buf(),
            None => env::var(CONFIG_ENV_VAR)
                .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from),
        };
        let metadata = fs::metadata(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "config file exceeds size limit: {} bytes (max {MAX_CONFIG_FILE_SIZE})",
                metadata.len()
            )));
        }
        let raw = fs::read_to_string(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_toml_str(&raw)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration, failing closed on any violation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on limit, backend, or series
    /// violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_query()?;
        self.validate_store()?;
        self.validate_series()
    }

    /// Returns the validated layout declared for a category, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the declared series is not a
    /// valid layout.
    pub fn series_layout(&self, category: &str) -> Result<Option<SeriesLayout>, ConfigError> {
        self.series
            .iter()
            .find(|series| series.category == category)
            .map(SeriesConfig::layout)
            .transpose()
    }

    /// Validates query limit bounds.
    fn validate_query(&self) -> Result<(), ConfigError> {
        if self.query.default_limit < 1 {
            return Err(ConfigError::Invalid(format!(
                "query.default_limit must be at least 1, got {}",
                self.query.default_limit
            )));
        }
        if self.query.max_scan_limit < self.query.default_limit {
            return Err(ConfigError::Invalid(format!(
                "query.max_scan_limit {} is below query.default_limit {}",
                self.query.max_scan_limit, self.query.default_limit
            )));
        }
        if self.query.max_scan_limit > MAX_SCAN_LIMIT_CEILING {
            return Err(ConfigError::Invalid(format!(
                "query.max_scan_limit {} exceeds ceiling {MAX_SCAN_LIMIT_CEILING}",
                self.query.max_scan_limit
            )));
        }
        Ok(())
    }

    /// Validates backend and cross-field store settings.
    fn validate_store(&self) -> Result<(), ConfigError> {
        match (self.store.backend, self.store.sqlite.as_ref()) {
            (StoreBackend::Sqlite, None) => Err(ConfigError::Invalid(
                "store.backend = \"sqlite\" requires a [store.sqlite] section".to_owned(),
            )),
            (StoreBackend::Sqlite, Some(sqlite)) => {
                if sqlite.path.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid(
                        "store.sqlite.path must not be empty".to_owned(),
                    ));
                }
                Ok(())
            }
            (StoreBackend::Memory, Some(_)) => Err(ConfigError::Invalid(
                "store.sqlite is set but store.backend is \"memory\"".to_owned(),
            )),
            (StoreBackend::Memory, None) => Ok(()),
        }
    }

    /// Validates declared series counts, shapes, and uniqueness.
    fn validate_series(&self) -> Result<(), ConfigError> {
        if self.series.len() > MAX_SERIES_ENTRIES {
            return Err(ConfigError::Invalid(format!(
                "at most {MAX_SERIES_ENTRIES} series may be declared, got {}",
                self.series.len()
            )));
        }
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for series in &self.series {
            if series.dimensions.len() > MAX_SERIES_DIMENSIONS {
                return Err(ConfigError::Invalid(format!(
                    "series {} declares {} dimensions (max {MAX_SERIES_DIMENSIONS})",
                    series.category,
                    series.dimensions.len()
                )));
            }
            series.layout()?;
            if !seen.insert(series.category.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate series category: {}",
                    series.category
                )));
            }
        }
        Ok(())
    }
}
