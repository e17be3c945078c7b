use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::gateway::GatewayStats;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub engine: String,
    pub gateway: GatewayStats,
}

/// Liveness plus gateway counters. Never touches the admission slot.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        engine: state.gateway.capability_name().to_string(),
        gateway: state.gateway.stats(),
    })
}
