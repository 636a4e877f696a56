//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    infrastructure::{
        bridge::BridgeHealth,
        dto::http::{HealthDto, HistoryMessageDto, MetricsDto},
    },
    ui::state::AppState,
    usecase::DEFAULT_HISTORY_LIMIT,
};

/// Health check endpoint
///
/// `degraded` while the bridge subscription is down: local delivery only.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    let bridge = *state.bridge_health.borrow();
    let status = if bridge == BridgeHealth::Connected {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthDto {
        status: status.to_string(),
        instance_id: state.instance_id.as_str().to_string(),
        bridge: bridge.as_str().to_string(),
        draining: !state.connect_usecase.is_admitting(),
    })
}

/// Instance metrics for the autoscaler
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsDto> {
    let snapshot = state.get_metrics_usecase.execute();

    // Domain Model から DTO への変換
    Json(MetricsDto {
        instance_id: snapshot.instance_id.into_string(),
        open_connections: snapshot.open_connections,
        accepted_total: snapshot.accepted_total,
        uptime_secs: snapshot.uptime_secs,
        memory_bytes: snapshot.memory_bytes,
        cpu_percent: snapshot.cpu_percent,
    })
}

/// Most recent stored messages, newest first
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HistoryMessageDto>>, StatusCode> {
    match state.get_history_usecase.execute(DEFAULT_HISTORY_LIMIT).await {
        Ok(messages) => Ok(Json(
            messages.into_iter().map(HistoryMessageDto::from).collect(),
        )),
        Err(e) => {
            tracing::warn!("History request failed: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
