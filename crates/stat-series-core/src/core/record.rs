// stat-series-core/src/core/record.rs
// ============================================================================
// Module: Stat Series Records
// Description: Stored record and insert payload shapes.
// Purpose: Pair a required timestamp with opaque caller-supplied fields.
// Dependencies: serde, serde_json, crate::core::time
// ============================================================================

//! ## Overview
//! A stats record is a timestamp plus an arbitrary mapping of statistic
//! fields this layer never interprets. The insert-side payload carries the
//! same fields with an optional timestamp; the provider defaults a missing
//! timestamp from its clock so that every persisted record carries the
//! timestamp encoded in its key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Stored Record
// ============================================================================

/// Persisted statistics record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Instant the record describes; always equal to the key's timestamp
    /// segment.
    pub timestamp: Timestamp,
    /// Caller-supplied statistic fields, opaque to this layer. The name
    /// `timestamp` is reserved and captured by the typed field above.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StatsRecord {
    /// Serializes the record into a JSON value for storage.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] when serialization fails.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Deserializes a record from a stored JSON value.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] when the value is not an object or
    /// lacks a canonical `timestamp` field.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

// ============================================================================
// SECTION: Insert Payload
// ============================================================================

/// Insert-side record shape; the timestamp may be omitted and defaulted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsPayload {
    /// Optional explicit timestamp; the provider's clock supplies a missing
    /// one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    /// Caller-supplied statistic fields, opaque to this layer.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StatsPayload {
    /// Creates a payload with no explicit timestamp.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            timestamp: None,
            fields,
        }
    }

    /// Creates a payload carrying an explicit timestamp.
    #[must_use]
    pub fn with_timestamp(timestamp: Timestamp, fields: Map<String, Value>) -> Self {
        Self {
            timestamp: Some(timestamp),
            fields,
        }
    }

    /// Finalizes the payload into a stored record, defaulting a missing
    /// timestamp.
    #[must_use]
    pub fn into_record(self, default_timestamp: Timestamp) -> StatsRecord {
        StatsRecord {
            timestamp: self.timestamp.unwrap_or(default_timestamp),
            fields: self.fields,
        }
    }
}
