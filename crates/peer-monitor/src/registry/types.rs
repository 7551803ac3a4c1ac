//! Peer and traffic types shared between the registry and the API.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as Unix milliseconds.
#[must_use]
pub fn unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Liveness and traffic record for one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRecord {
    /// Unique peer identifier, fixed at creation
    pub node_id: String,
    /// Display alias (empty until set)
    pub alias: String,
    /// Last activity as Unix milliseconds
    pub last_seen_millis: u64,
    /// Bytes this peer has sent
    pub sent_bytes: u64,
    /// Bytes this peer has received
    pub received_bytes: u64,
    /// Reserved queue depth, not mutated by any current operation
    pub queued: u64,
}

impl PeerRecord {
    /// Fresh record with zero counters and an empty alias.
    #[must_use]
    pub fn new(node_id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            node_id: node_id.into(),
            alias: String::new(),
            last_seen_millis: now_ms,
            sent_bytes: 0,
            received_bytes: 0,
            queued: 0,
        }
    }
}

/// Body of `POST /send`.
///
/// Every field is optional on the wire; blank endpoints are rejected by
/// [`crate::MonitorState::record_send`], not by deserialization. Scalars
/// are coerced: numbers and `true` become text, numeric strings become
/// counts. `null`, `false`, `0` and `""` read as absent. Arrays and
/// objects are malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    #[serde(deserialize_with = "loose_text")]
    pub from: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub to: Option<String>,
    #[serde(deserialize_with = "loose_count")]
    pub bytes: Option<u64>,
    #[serde(deserialize_with = "loose_text")]
    pub message: Option<String>,
}

impl SendRequest {
    /// Convenience constructor used by tests and clients.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Traffic units this send accounts for.
    ///
    /// Explicit non-zero `bytes` wins, then the length of `message` in
    /// UTF-16 code units, and a send of unknown size always counts as 1.
    #[must_use]
    pub fn effective_bytes(&self) -> u64 {
        if let Some(bytes) = self.bytes.filter(|b| *b > 0) {
            return bytes;
        }
        let message_len = self
            .message
            .as_deref()
            .map(|m| m.encode_utf16().count() as u64)
            .unwrap_or(0);
        if message_len > 0 { message_len } else { 1 }
    }
}

fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Ok(Some(s)),
        Value::Number(n) if n.as_f64() != Some(0.0) => Ok(Some(n.to_string())),
        Value::Bool(true) => Ok(Some("true".to_string())),
        Value::Null | Value::Bool(false) | Value::String(_) | Value::Number(_) => Ok(None),
        Value::Array(_) | Value::Object(_) => Err(D::Error::custom(
            "invalid type: expected a string, number or boolean",
        )),
    }
}

/// Fractions are truncated; anything below 1 or unparsable reads as absent.
fn loose_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => return Ok(None),
        Value::Bool(true) => 1.0,
        Value::Number(n) => match n.as_u64() {
            Some(exact) => return Ok(Some(exact).filter(|b| *b > 0)),
            None => n.as_f64().unwrap_or(0.0),
        },
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Array(_) | Value::Object(_) => {
            return Err(D::Error::custom(
                "invalid type: expected a number or numeric string",
            ));
        }
    };
    Ok((value.is_finite() && value >= 1.0).then(|| value as u64))
}

/// Both peer records after a send has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub from: PeerRecord,
    pub to: PeerRecord,
}

/// Process-wide traffic counters. Only ever increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficTotals {
    pub total_sent: u64,
    pub total_received: u64,
}

impl TrafficTotals {
    /// Account one transfer of `bytes` on both sides.
    pub fn record(&mut self, bytes: u64) {
        self.total_sent = self.total_sent.saturating_add(bytes);
        self.total_received = self.total_received.saturating_add(bytes);
    }
}
