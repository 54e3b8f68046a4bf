//! Health check handler

use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::interfaces::http::state::AppState;

/// Service health response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage: ComponentHealth,
    pub live_sessions: usize,
    pub tracked_links: usize,
    pub event_subscribers: usize,
}

/// Component health status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Storage unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let uptime = state.started_at.elapsed().as_secs();

    let probe_start = Instant::now();
    let (storage, live_sessions) = match state.repos.sessions().find_live().await {
        Ok(live) => (
            ComponentHealth {
                status: "ok".to_string(),
                latency_ms: Some(probe_start.elapsed().as_millis() as u64),
            },
            live.len(),
        ),
        Err(_) => (
            ComponentHealth {
                status: "error".to_string(),
                latency_ms: None,
            },
            0,
        ),
    };

    let healthy = storage.status == "ok";
    let http_status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime,
            storage,
            live_sessions,
            tracked_links: state.monitor.states().len(),
            event_subscribers: state.event_bus.subscriber_count(),
        }),
    )
}
