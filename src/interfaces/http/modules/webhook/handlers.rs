//! Connectivity webhook handlers

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::warn;

use super::dto::{LinkStateResponse, WebhookResponse, WebhookSignal};
use crate::interfaces::http::common::{status_for, ApiResponse};
use crate::interfaces::http::state::AppState;

#[utoipa::path(
    post,
    path = "/playstation/webhook",
    tag = "Connectivity",
    params(WebhookSignal),
    request_body(content = WebhookSignal, description = "Optional; query parameters are used when absent"),
    responses(
        (status = 200, description = "Signal processed (possibly without effect)", body = WebhookResponse),
        (status = 400, description = "Missing or invalid mac/action", body = WebhookResponse),
        (status = 404, description = "No station with this MAC", body = WebhookResponse)
    )
)]
pub async fn connectivity_webhook(
    State(state): State<AppState>,
    Query(query): Query<WebhookSignal>,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let signal = if body.iter().all(u8::is_ascii_whitespace) {
        query
    } else {
        match serde_json::from_slice::<WebhookSignal>(&body) {
            Ok(from_body) => query.merge(from_body),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(WebhookResponse::failure(format!("Invalid JSON body: {e}"))),
                )
            }
        }
    };

    let (Some(mac), Some(action)) = (signal.mac, signal.action) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(WebhookResponse::failure("Both 'mac' and 'action' are required")),
        );
    };

    match state.monitor.handle_signal(&mac, &action).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome.into())),
        Err(e) => {
            warn!(mac = %mac, action = %action, error = %e, "Connectivity signal rejected");
            (status_for(&e), Json(WebhookResponse::failure(e.to_string())))
        }
    }
}

#[utoipa::path(
    get,
    path = "/playstation/connectivity",
    tag = "Connectivity",
    responses(
        (status = 200, description = "Tracked link states", body = ApiResponse<Vec<LinkStateResponse>>)
    )
)]
pub async fn list_link_states(State(state): State<AppState>) -> Json<ApiResponse<Vec<LinkStateResponse>>> {
    let links = state.monitor.states().into_iter().map(Into::into).collect();
    Json(ApiResponse::success(links))
}
