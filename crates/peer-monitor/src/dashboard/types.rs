//! API response types for the monitor endpoints.
//!
//! Field names are camelCase on the wire; the dashboard page reads them
//! directly.

use crate::registry::{PeerRecord, SendReceipt};
use crate::sampler::{MemoryUsage, PlatformInfo};
use serde::{Deserialize, Serialize};

/// `GET /health` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// `GET /stats` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Whole seconds since the monitor started
    pub uptime_sec: u64,
    /// Bytes accounted on the sending side of every send
    pub total_sent: u64,
    /// Bytes accounted on the receiving side of every send
    pub total_received: u64,
    /// Lateness of the latest sampler tick
    pub loop_lag_millis: u64,
    pub cpu: CpuStatsApi,
    pub memory: MemoryUsage,
    pub platform: PlatformApi,
}

/// Process CPU utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStatsApi {
    /// 0..=100 across all cores
    pub percent: u8,
}

/// Host description with the current core count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformApi {
    pub platform: String,
    pub release: String,
    pub arch: String,
    pub cores: usize,
}

impl PlatformApi {
    #[must_use]
    pub fn new(info: &PlatformInfo, cores: usize) -> Self {
        Self {
            platform: info.platform.clone(),
            release: info.release.clone(),
            arch: info.arch.clone(),
            cores,
        }
    }
}

/// `POST /send` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub ok: bool,
    pub from: PeerRecord,
    pub to: PeerRecord,
}

impl From<SendReceipt> for SendResponse {
    fn from(receipt: SendReceipt) -> Self {
        Self {
            ok: true,
            from: receipt.from,
            to: receipt.to,
        }
    }
}

/// Structured failure body, used for validation errors only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}
