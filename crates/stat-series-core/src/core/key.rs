// stat-series-core/src/core/key.rs
// ============================================================================
// Module: Stat Series Key Codec
// Description: Record key encoding, decoding, and prefix construction.
// Purpose: Make lexicographic key order equal chronological record order.
// Dependencies: serde, crate::core::time
// ============================================================================

//! ## Overview
//! A record key is a `/`-joined sequence of segments: a category, zero or
//! more dimension values, and a trailing canonical timestamp. Because the
//! timestamp segment is fixed width and zero padded, string order over keys
//! that share their leading segments equals chronological order. Every call
//! site builds keys through [`SeriesLayout`]; there is no ad hoc key
//! construction elsewhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Delimiter joining key segments.
pub const KEY_DELIMITER: char = '/';

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key encoding contract violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// A segment is empty or contains the delimiter.
    #[error("invalid key segment: {0}")]
    InvalidSegment(String),
    /// A key does not match the layout's segment count, category, or
    /// timestamp form.
    #[error("malformed record key: {0}")]
    MalformedKey(String),
}

// ============================================================================
// SECTION: Key Types
// ============================================================================

/// Full record key: category, dimension segments, and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    /// Creates a record key from its string form.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Record key with the timestamp segment (and optionally trailing dimension
/// segments) omitted; scopes a scan without constraining time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// Creates a key prefix from its string form.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// Returns the prefix as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the smallest key strictly greater than every key carrying
    /// this prefix, or `None` when no such bound exists.
    ///
    /// The successor increments the final code point, carrying leftward past
    /// code points with no successor. UTF-8 preserves code point order under
    /// byte comparison, so the returned key is a correct exclusive upper
    /// bound for both string and byte-ordered stores.
    #[must_use]
    pub fn successor(&self) -> Option<RecordKey> {
        let mut chars: Vec<char> = self.0.chars().collect();
        while let Some(last) = chars.pop() {
            if let Some(next) = next_char(last) {
                chars.push(next);
                return Some(RecordKey::new(chars.into_iter().collect::<String>()));
            }
        }
        None
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Explicit key range: `from` inclusive, `to` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    /// Inclusive lower bound.
    pub from: RecordKey,
    /// Exclusive upper bound.
    pub to: RecordKey,
}

impl KeyRange {
    /// Creates a key range from its bounds.
    #[must_use]
    pub fn new(from: impl Into<RecordKey>, to: impl Into<RecordKey>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Decoded record key components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    /// Category segment.
    pub category: String,
    /// Dimension segments in layout order.
    pub dimensions: Vec<String>,
    /// Trailing timestamp segment.
    pub timestamp: Timestamp,
}

// ============================================================================
// SECTION: Series Layout
// ============================================================================

/// Key shape for one logical series: a category plus ordered dimension
/// names. One layout instance parameterizes a provider per use case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesLayout {
    /// Fixed category segment leading every key.
    category: String,
    /// Ordered dimension names; values fill these positions in keys.
    dimensions: Vec<String>,
}

impl SeriesLayout {
    /// Creates a layout after validating every declared segment.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidSegment`] when the category or a dimension
    /// name is empty or contains the delimiter.
    pub fn new(
        category: impl Into<String>,
        dimensions: Vec<String>,
    ) -> Result<Self, KeyError> {
        let category = category.into();
        validate_segment(&category)?;
        for dimension in &dimensions {
            validate_segment(dimension)?;
        }
        Ok(Self {
            category,
            dimensions,
        })
    }

    /// Returns the category segment.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the ordered dimension names.
    #[must_use]
    pub fn dimension_names(&self) -> &[String] {
        &self.dimensions
    }

    /// Encodes a full record key from dimension values and a timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::MalformedKey`] when the dimension count does not
    /// match the layout, and [`KeyError::InvalidSegment`] when a dimension
    /// value is empty or contains the delimiter.
    pub fn encode(
        &self,
        dimensions: &[&str],
        timestamp: Timestamp,
    ) -> Result<RecordKey, KeyError> {
        if dimensions.len() != self.dimensions.len() {
            return Err(KeyError::MalformedKey(format!(
                "expected {} dimension segments for category {}, got {}",
                self.dimensions.len(),
                self.category,
                dimensions.len()
            )));
        }
        let mut key = self.join_segments(dimensions)?;
        key.push(KEY_DELIMITER);
        let canonical =
            timestamp.to_canonical_string().map_err(|err| KeyError::MalformedKey(err.to_string()))?;
        key.push_str(&canonical);
        Ok(RecordKey::new(key))
    }

    /// Builds a scan prefix from a leading subset of dimension values. The
    /// prefix omits the timestamp segment and the trailing delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::MalformedKey`] when more dimensions are supplied
    /// than the layout declares, and [`KeyError::InvalidSegment`] when a
    /// value is empty or contains the delimiter.
    pub fn prefix(&self, dimensions: &[&str]) -> Result<KeyPrefix, KeyError> {
        if dimensions.len() > self.dimensions.len() {
            return Err(KeyError::MalformedKey(format!(
                "at most {} dimension segments allowed for category {}, got {}",
                self.dimensions.len(),
                self.category,
                dimensions.len()
            )));
        }
        self.join_segments(dimensions).map(KeyPrefix::new)
    }

    /// Decodes a record key into its components.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::MalformedKey`] when the segment count or category
    /// does not match the layout, when a dimension segment is empty, or when
    /// the timestamp segment is not canonical.
    pub fn decode(&self, key: &RecordKey) -> Result<DecodedKey, KeyError> {
        let segments: Vec<&str> = key.as_str().split(KEY_DELIMITER).collect();
        let expected = self.dimensions.len() + 2;
        if segments.len() != expected {
            return Err(KeyError::MalformedKey(format!(
                "expected {expected} segments in key {key}, got {}",
                segments.len()
            )));
        }
        let Some((category, rest)) = segments.split_first() else {
            return Err(KeyError::MalformedKey(format!("empty key {key}")));
        };
        if *category != self.category {
            return Err(KeyError::MalformedKey(format!(
                "key {key} does not belong to category {}",
                self.category
            )));
        }
        let Some((raw_timestamp, dimensions)) = rest.split_last() else {
            return Err(KeyError::MalformedKey(format!("missing timestamp segment in key {key}")));
        };
        for dimension in dimensions {
            if dimension.is_empty() {
                return Err(KeyError::MalformedKey(format!(
                    "empty dimension segment in key {key}"
                )));
            }
        }
        let timestamp = Timestamp::parse(raw_timestamp)
            .map_err(|err| KeyError::MalformedKey(format!("key {key}: {err}")))?;
        Ok(DecodedKey {
            category: (*category).to_owned(),
            dimensions: dimensions.iter().map(|segment| (*segment).to_owned()).collect(),
            timestamp,
        })
    }

    /// Joins the category and the given dimension values with the delimiter.
    fn join_segments(&self, dimensions: &[&str]) -> Result<String, KeyError> {
        let mut joined = self.category.clone();
        for dimension in dimensions {
            validate_segment(dimension)?;
            joined.push(KEY_DELIMITER);
            joined.push_str(dimension);
        }
        Ok(joined)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a single key segment.
fn validate_segment(segment: &str) -> Result<(), KeyError> {
    if segment.is_empty() {
        return Err(KeyError::InvalidSegment("segment is empty".to_owned()));
    }
    if segment.contains(KEY_DELIMITER) {
        return Err(KeyError::InvalidSegment(format!(
            "segment {segment} contains the delimiter {KEY_DELIMITER}"
        )));
    }
    Ok(())
}

/// Returns the next code point after `value`, skipping the surrogate gap.
const fn next_char(value: char) -> Option<char> {
    match value {
        char::MAX => None,
        '\u{D7FF}' => Some('\u{E000}'),
        _ => char::from_u32(value as u32 + 1),
    }
}
