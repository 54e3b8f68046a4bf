use axum::{extract::State, http::header, response::IntoResponse};
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

use super::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
use crate::application::billing::engine::{SESSIONS_ENDED_TOTAL, SESSIONS_STARTED_TOTAL};
use crate::application::connectivity::CONNECTIVITY_SIGNALS_TOTAL;
use crate::application::notifications::NOTIFICATIONS_FAILED_TOTAL;

#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
}

/// Attach help text to every metric the service emits. Call once after the
/// recorder is installed.
pub fn describe_metrics() {
    metrics::describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP requests by route and status");
    metrics::describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "HTTP request latency by route"
    );
    metrics::describe_counter!(SESSIONS_STARTED_TOTAL, "Sessions opened, by started_by");
    metrics::describe_counter!(SESSIONS_ENDED_TOTAL, "Sessions closed, by started_by");
    metrics::describe_counter!(
        CONNECTIVITY_SIGNALS_TOTAL,
        "Router connectivity signals received, by action"
    );
    metrics::describe_counter!(
        NOTIFICATIONS_FAILED_TOTAL,
        "Notification deliveries that failed, by dispatcher"
    );
}

/// `GET /metrics`
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.handle.render(),
    )
}
