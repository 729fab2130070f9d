//! Core types for chatlog-dl

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unique identifier for a message
///
/// Snowflake-style: ids are strictly decreasing in fetch order relative to a
/// `before` cursor, so ordering ids orders messages in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Create a new MessageId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<MessageId> for u64 {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// A single chat message as returned by the remote feed
///
/// Only `id` and `timestamp` are interpreted; the rest of the structure is
/// carried in `raw` and passed through to persistence unmodified.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Unique message identifier
    pub id: MessageId,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
    /// The full original JSON object
    pub raw: serde_json::Value,
}

impl Message {
    /// Build a message from a raw feed object, extracting id and timestamp
    ///
    /// The id may arrive as a JSON string or number. The timestamp must be an
    /// RFC 3339 string. Everything else is left untouched in `raw`.
    pub fn from_value(raw: serde_json::Value) -> Result<Self> {
        let id = match raw.get("id") {
            Some(serde_json::Value::String(s)) => s
                .parse::<MessageId>()
                .map_err(|e| Error::InvalidMessage(format!("non-numeric id {s:?}: {e}")))?,
            Some(serde_json::Value::Number(n)) => n
                .as_u64()
                .map(MessageId::new)
                .ok_or_else(|| Error::InvalidMessage(format!("id out of range: {n}")))?,
            _ => return Err(Error::InvalidMessage("missing id field".to_string())),
        };

        let timestamp = raw
            .get("timestamp")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidMessage(format!("message {id} has no timestamp")))?;
        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|e| {
                Error::InvalidMessage(format!("message {id} timestamp {timestamp:?}: {e}"))
            })?
            .with_timezone(&Utc);

        Ok(Self { id, timestamp, raw })
    }
}

/// Channel identity resolved once per run and attached to every persisted row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    /// Human-readable server (guild) name
    pub server_name: String,
    /// Server (guild) identifier
    pub server_id: String,
    /// Human-readable channel name
    pub channel_name: String,
    /// Channel identifier
    pub channel_id: String,
}

/// Options for one scrape invocation
#[derive(Clone, Debug, Default)]
pub struct ScrapeOptions {
    /// Maximum messages to keep (0 = unlimited), enforced after filtering
    pub max_messages: u64,
    /// Inclusive lower timestamp bound
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound
    pub end: Option<DateTime<Utc>>,
    /// Token checked at every loop boundary and suspension point
    pub cancel: tokio_util::sync::CancellationToken,
}

/// Aggregate result of one scrape invocation, immutable after return
///
/// A failed run still carries whatever was fetched and appended before the
/// failure; a non-empty `errors` list means the run did not fully succeed
/// even when output was written.
#[derive(Clone, Debug, Default)]
pub struct ScrapeResult {
    /// Messages kept by the run (post-filter, post-cap)
    pub messages: Vec<Message>,
    /// Raw messages fetched from the feed (pre-filter)
    pub total_scraped: u64,
    /// Rows successfully appended to the export artifact
    pub total_appended: u64,
    /// Terminal and per-record errors encountered during the run
    pub errors: Vec<String>,
    /// Non-fatal notices (cancellation, skipped records)
    pub warnings: Vec<String>,
    /// Wall-clock duration of the run, including authentication and validation
    pub duration: Duration,
}

impl ScrapeResult {
    /// True when the run finished without recording any error
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse a caller-supplied timestamp bound
///
/// Accepts RFC 3339 / ISO-8601 (`2024-03-01T12:30:00Z`, offset forms, or a
/// naive datetime taken as UTC) and plain calendar dates (`2024-03-01`). A
/// bare date parses to that date's midnight, and bounds stay inclusive at the
/// literal parse value — an end bound of `2024-03-01` excludes the rest of
/// that day. Callers wanting end-of-day supply an explicit time.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        // and_hms_opt(0, 0, 0) cannot fail for midnight
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(Error::InvalidTimestamp {
        input: input.to_string(),
        reason: "expected RFC 3339, YYYY-MM-DDTHH:MM:SS, or YYYY-MM-DD".to_string(),
    })
}
