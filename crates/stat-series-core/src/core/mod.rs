// stat-series-core/src/core/mod.rs
// ============================================================================
// Module: Stat Series Core Types
// Description: Canonical key, timestamp, record, and query types.
// Purpose: Provide stable, serializable types for the time-series layer.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Core types define the canonical record identity (category, dimensions,
//! timestamp), its key encoding, the stored record shape, and the query
//! option surface. These types are the single source of truth for every
//! store backend and caller.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod hashing;
pub mod key;
pub mod query;
pub mod record;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use key::DecodedKey;
pub use key::KEY_DELIMITER;
pub use key::KeyError;
pub use key::KeyPrefix;
pub use key::KeyRange;
pub use key::RecordKey;
pub use key::SeriesLayout;
pub use query::QueryOptions;
pub use query::ScanQuery;
pub use query::SortDirection;
pub use query::floor_limit;
pub use record::StatsPayload;
pub use record::StatsRecord;
pub use time::CANONICAL_TIMESTAMP_LENGTH;
pub use time::Timestamp;
pub use time::TimestampError;
