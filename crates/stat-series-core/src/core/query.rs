// stat-series-core/src/core/query.rs
// ============================================================================
// Module: Stat Series Query Options
// Description: Sort direction, limits, and scan selector options.
// Purpose: Normalize caller-supplied query options before store access.
// Dependencies: serde, crate::core::key
// ============================================================================

//! ## Overview
//! Scan-based operations accept a sort direction and a result limit. The
//! direction defaults to newest first. Limits are floored at one whenever a
//! limit is requested; an explicit range scan with no limit stays unbounded.
//! A raw scan names either a prefix or an explicit range, never both.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::key::KeyPrefix;
use crate::core::key::KeyRange;

// ============================================================================
// SECTION: Sort Direction
// ============================================================================

/// Key-order scan direction. The store is key sorted, so sorting is always
/// on the key; only the direction varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Oldest first.
    Ascend,
    /// Newest first.
    #[default]
    Descend,
}

// ============================================================================
// SECTION: Query Options
// ============================================================================

/// Options for the scope-based scan operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Scan direction; defaults to [`SortDirection::Descend`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
    /// Result cap; values below one coerce up to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl QueryOptions {
    /// Returns options selecting the default sort with the given limit.
    #[must_use]
    pub const fn with_limit(limit: i64) -> Self {
        Self {
            sort: None,
            limit: Some(limit),
        }
    }

    /// Returns options selecting the given sort direction with no limit.
    #[must_use]
    pub const fn with_sort(sort: SortDirection) -> Self {
        Self {
            sort: Some(sort),
            limit: None,
        }
    }
}

// ============================================================================
// SECTION: Scan Query
// ============================================================================

/// Raw scan surface: exactly one of `prefix` or `range` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanQuery {
    /// Prefix selector scoping the scan to one series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<KeyPrefix>,
    /// Explicit `[from, to)` key range selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<KeyRange>,
    /// Scan direction; defaults to [`SortDirection::Descend`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
    /// Result cap; a supplied value below one coerces up to one, an omitted
    /// value leaves the scan unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

// ============================================================================
// SECTION: Limit Normalization
// ============================================================================

/// Floors a requested limit at one.
#[must_use]
pub fn floor_limit(limit: i64) -> u64 {
    limit.max(1).unsigned_abs()
}
