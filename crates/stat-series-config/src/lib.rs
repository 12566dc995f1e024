// stat-series-config/src/lib.rs
// ============================================================================
// Module: Stat Series Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for stat-series.toml semantics.
// Dependencies: stat-series-core, stat-series-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `stat-series-config` defines the canonical configuration model for the
//! stat-series layer: store backend selection, query limit defaults, and the
//! declared series layouts. Parsing and validation are strict and fail
//! closed; a config that would admit keys the codec rejects never loads.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::QueryConfig;
pub use config::SeriesConfig;
pub use config::StatSeriesConfig;
pub use config::StoreBackend;
pub use config::StoreConfig;
