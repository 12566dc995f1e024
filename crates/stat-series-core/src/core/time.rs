// stat-series-core/src/core/time.rs
// ============================================================================
// Module: Stat Series Canonical Timestamps
// Description: UTC millisecond-precision timestamps with a canonical ISO-8601 form.
// Purpose: Guarantee lexicographic timestamp order equals chronological order.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Every record key ends in a canonical timestamp segment. Correctness of all
//! latest and range queries depends on that segment sorting lexicographically
//! in chronological order, so timestamps are pinned to a single canonical
//! form: UTC, ISO-8601 extended, millisecond precision, fixed width, zero
//! padded (`2024-01-02T03:04:05.678Z`). Construction truncates finer
//! precision and rejects years outside `0..=9999`, where fixed-width
//! ordering would no longer hold.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Canonical timestamp format: ISO-8601 extended, UTC, millisecond precision.
const CANONICAL_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// Length of a canonical timestamp string.
pub const CANONICAL_TIMESTAMP_LENGTH: usize = 24;

/// Nanoseconds per millisecond, used when truncating precision.
const NANOS_PER_MILLI: u32 = 1_000_000;

/// Smallest year whose canonical form is fixed width.
const MIN_YEAR: i32 = 0;

/// Largest year whose canonical form is fixed width.
const MAX_YEAR: i32 = 9999;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canonical timestamp violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    /// Input does not match the canonical timestamp form.
    #[error("timestamp format error: {0}")]
    Format(String),
    /// Instant falls outside the representable year range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// UTC instant at millisecond precision with a canonical string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Creates a timestamp from a datetime, truncating to millisecond
    /// precision.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::OutOfRange`] when the instant's UTC year is
    /// outside `0..=9999`.
    pub fn from_datetime(value: OffsetDateTime) -> Result<Self, TimestampError> {
        let utc = value.to_offset(time::UtcOffset::UTC);
        let year = utc.year();
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(TimestampError::OutOfRange(format!(
                "year {year} is outside the canonical range {MIN_YEAR}..={MAX_YEAR}"
            )));
        }
        Ok(Self(truncate_to_millis(utc)))
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::OutOfRange`] when the instant falls outside
    /// the canonical year range.
    pub fn from_unix_millis(millis: i64) -> Result<Self, TimestampError> {
        let nanos = i128::from(millis) * i128::from(NANOS_PER_MILLI);
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|err| TimestampError::OutOfRange(err.to_string()))?;
        Self::from_datetime(datetime)
    }

    /// Returns the current UTC instant truncated to millisecond precision.
    #[must_use]
    pub fn now_utc() -> Self {
        Self(truncate_to_millis(OffsetDateTime::now_utc()))
    }

    /// Parses a canonical timestamp string.
    ///
    /// Parsing is strict: the input must round-trip to itself through the
    /// canonical formatter, which rejects non-UTC offsets, missing padding,
    /// explicit signs, and trailing input.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Format`] when the input is not canonical.
    pub fn parse(input: &str) -> Result<Self, TimestampError> {
        if input.len() != CANONICAL_TIMESTAMP_LENGTH {
            return Err(TimestampError::Format(format!(
                "expected {CANONICAL_TIMESTAMP_LENGTH} characters, got {}",
                input.len()
            )));
        }
        let parsed = PrimitiveDateTime::parse(input, CANONICAL_FORMAT)
            .map_err(|err| TimestampError::Format(err.to_string()))?;
        let timestamp = Self::from_datetime(parsed.assume_utc())
            .map_err(|err| TimestampError::Format(err.to_string()))?;
        let canonical = timestamp.to_canonical_string()?;
        if canonical != input {
            return Err(TimestampError::Format(format!(
                "non-canonical timestamp: parsed {input}, canonical form is {canonical}"
            )));
        }
        Ok(timestamp)
    }

    /// Returns the canonical string form of this timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Format`] when formatting fails; the year
    /// range validation at construction makes this unreachable in practice.
    pub fn to_canonical_string(&self) -> Result<String, TimestampError> {
        self.0.format(CANONICAL_FORMAT).map_err(|err| TimestampError::Format(err.to_string()))
    }

    /// Returns the underlying datetime.
    #[must_use]
    pub const fn as_datetime(&self) -> OffsetDateTime {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let canonical = self.to_canonical_string().map_err(|_| fmt::Error)?;
        f.write_str(&canonical)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let canonical = self.to_canonical_string().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&canonical)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Truncates a datetime to millisecond precision.
fn truncate_to_millis(value: OffsetDateTime) -> OffsetDateTime {
    let nanos = value.nanosecond() / NANOS_PER_MILLI * NANOS_PER_MILLI;
    value.replace_nanosecond(nanos).unwrap_or(value)
}
