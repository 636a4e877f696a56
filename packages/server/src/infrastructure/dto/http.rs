//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Response of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    /// `ok` or `degraded`
    pub status: String,
    pub instance_id: String,
    /// `connecting`, `connected` or `disconnected`
    pub bridge: String,
    pub draining: bool,
}

/// Response of `GET /api/metrics`, consumed by the autoscaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDto {
    pub instance_id: String,
    pub open_connections: usize,
    pub accepted_total: u64,
    pub uptime_secs: u64,
    pub memory_bytes: u64,
    pub cpu_percent: f32,
}

/// One entry of `GET /api/messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessageDto {
    pub display_name: String,
    pub body: String,
    pub instance_id: String,
    /// RFC 3339 (UTC)
    pub created_at: String,
}
