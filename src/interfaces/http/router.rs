//! API router with Swagger UI

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::common::ApiResponse;
use super::modules::{events, health, metrics, sessions, stations, webhook};
use super::state::AppState;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Sessions
        sessions::start_session,
        sessions::list_active_sessions,
        sessions::get_session,
        sessions::get_session_cost,
        sessions::end_session,
        sessions::pause_session,
        sessions::resume_session,
        sessions::switch_mode,
        sessions::add_charge,
        sessions::remove_charge,
        sessions::record_order,
        sessions::set_timer,
        sessions::set_cost_limit,
        sessions::set_notes,
        sessions::transfer_session,
        sessions::switch_station,
        // Stations
        stations::list_stations,
        stations::update_station_status,
        // Connectivity
        webhook::connectivity_webhook,
        webhook::list_link_states,
        // Events
        events::event_stream,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            sessions::SessionResponse,
            sessions::SegmentCostResponse,
            sessions::CostResponse,
            sessions::LiveSessionResponse,
            sessions::SegmentResponse,
            sessions::ChargeResponse,
            sessions::TransferResponse,
            sessions::SessionDetailsResponse,
            sessions::EndSessionResponse,
            sessions::StartSessionRequest,
            sessions::EndSessionRequest,
            sessions::SwitchModeRequest,
            sessions::AddChargeRequest,
            sessions::RecordOrderRequest,
            sessions::SetTimerRequest,
            sessions::SetCostLimitRequest,
            sessions::SetNotesRequest,
            sessions::TransferSessionRequest,
            sessions::SwitchStationRequest,
            stations::StationResponse,
            stations::UpdateStationStatusRequest,
            webhook::WebhookSignal,
            webhook::WebhookResponse,
            webhook::LinkStateResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Sessions", description = "Session lifecycle, adjustments and transfers; amounts in piasters"),
        (name = "Stations", description = "Station registry and maintenance"),
        (name = "Connectivity", description = "Router webhook driving automatic start and end"),
        (name = "Events", description = "Live notification stream"),
    ),
    info(
        title = "Venue Billing API",
        version = "1.0.0",
        description = "Per-minute billing for console gaming stations",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/sessions", post(sessions::start_session))
        .route("/api/v1/sessions/active", get(sessions::list_active_sessions))
        .route("/api/v1/sessions/{id}", get(sessions::get_session))
        .route("/api/v1/sessions/{id}/cost", get(sessions::get_session_cost))
        .route("/api/v1/sessions/{id}/end", post(sessions::end_session))
        .route("/api/v1/sessions/{id}/pause", post(sessions::pause_session))
        .route("/api/v1/sessions/{id}/resume", post(sessions::resume_session))
        .route("/api/v1/sessions/{id}/mode", put(sessions::switch_mode))
        .route("/api/v1/sessions/{id}/charges", post(sessions::add_charge))
        .route(
            "/api/v1/sessions/{id}/charges/{charge_id}",
            delete(sessions::remove_charge),
        )
        .route("/api/v1/sessions/{id}/orders", post(sessions::record_order))
        .route("/api/v1/sessions/{id}/timer", put(sessions::set_timer))
        .route("/api/v1/sessions/{id}/cost-limit", put(sessions::set_cost_limit))
        .route("/api/v1/sessions/{id}/notes", put(sessions::set_notes))
        .route("/api/v1/sessions/{id}/transfer", post(sessions::transfer_session))
        .route("/api/v1/sessions/{id}/station", put(sessions::switch_station))
}

/// Build the full HTTP surface. `/metrics` is mounted only when a Prometheus
/// recorder is installed.
pub fn create_router(state: AppState, prometheus: Option<PrometheusHandle>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .merge(session_routes())
        .route("/api/v1/stations", get(stations::list_stations))
        .route(
            "/api/v1/stations/{id}/status",
            put(stations::update_station_status),
        )
        .route("/api/v1/events", get(events::event_stream))
        .route("/playstation/webhook", post(webhook::connectivity_webhook))
        .route("/playstation/connectivity", get(webhook::list_link_states))
        .route("/health", get(health::health_check))
        .route_layer(middleware::from_fn(metrics::http_metrics_middleware))
        .with_state(state);

    let mut router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(api);

    if let Some(handle) = prometheus {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics::prometheus_metrics))
                .with_state(metrics::MetricsState { handle }),
        );
    }

    router.layer(cors).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::application::{create_event_bus, BillingEngine, ConnectivityMonitor, Notifier};
    use crate::domain::{RepositoryProvider, Station, StationStatus};
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use crate::shared::clock::ManualClock;

    struct TestApp {
        router: Router,
        clock: Arc<ManualClock>,
        repos: Arc<InMemoryRepositoryProvider>,
    }

    async fn app() -> TestApp {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        for (id, mac, multi) in [
            ("ps-1", "aa:bb:cc:dd:ee:01", Some(3500)),
            ("ps-2", "aa:bb:cc:dd:ee:02", None),
        ] {
            repos
                .stations()
                .upsert(Station {
                    id: id.into(),
                    name: id.to_uppercase(),
                    mac_address: mac.into(),
                    hourly_rate_single: 2000,
                    hourly_rate_multi: multi,
                    status: StationStatus::Available,
                })
                .await
                .unwrap();
        }

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap(),
        ));
        let engine = Arc::new(BillingEngine::new(
            repos.clone(),
            clock.clone(),
            Notifier::new(),
        ));
        let state = AppState {
            monitor: Arc::new(ConnectivityMonitor::new(repos.clone(), engine.clone())),
            engine,
            repos: repos.clone(),
            event_bus: create_event_bus(16),
            started_at: Arc::new(Instant::now()),
        };

        TestApp {
            router: create_router(state, None),
            clock,
            repos,
        }
    }

    async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn start(app: &TestApp, station_id: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/v1/sessions",
            Some(json!({ "station_id": station_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn start_then_end_bills_elapsed_time() {
        let app = app().await;
        let id = start(&app, "ps-1").await;

        let (status, body) = send(&app, "GET", "/api/v1/sessions/active", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["session"]["status"], "active");

        app.clock.advance_minutes(90);
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/end"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["total_cost"], 3000);
        assert_eq!(body["data"]["session"]["status"], "ended");

        let (_, body) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(body["data"]["segments"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["cost"]["gaming_cost"], 3000);
    }

    #[tokio::test]
    async fn domain_errors_map_to_statuses() {
        let app = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/sessions",
            Some(json!({ "station_id": "ps-9" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());

        let id = start(&app, "ps-1").await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/sessions",
            Some(json!({ "station_id": "ps-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/v1/sessions/{id}/mode"),
            Some(json!({ "mode": "team" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "POST", &format!("/api/v1/sessions/{id}/resume"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn field_validation_is_unprocessable() {
        let app = app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/sessions",
            Some(json!({ "station_id": "ps-1", "timer_minutes": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("timer_minutes"));

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/sessions",
            Some(json!({ "station_id": "ps-1", "timer_minutes": 10081 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn adjustments_round_trip() {
        let app = app().await;
        let id = start(&app, "ps-1").await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/charges"),
            Some(json!({ "amount": -500, "reason": "loyalty" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let charge_id = body["data"]["id"].as_str().unwrap().to_string();

        let (_, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/orders"),
            Some(json!({ "amount": 1500 })),
        )
        .await;
        assert_eq!(body["data"]["orders_cost"], 1500);
        assert_eq!(body["data"]["extra_charges"], -500);

        let (status, body) = send(
            &app,
            "DELETE",
            &format!("/api/v1/sessions/{id}/charges/{charge_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["extra_charges"], 0);

        let (_, body) = send(
            &app,
            "PUT",
            &format!("/api/v1/sessions/{id}/timer"),
            Some(json!({ "minutes": 60 })),
        )
        .await;
        assert_eq!(body["data"]["timer_minutes"], 60);

        let (_, body) = send(
            &app,
            "PUT",
            &format!("/api/v1/sessions/{id}/notes"),
            Some(json!({ "notes": "  birthday  " })),
        )
        .await;
        assert_eq!(body["data"]["notes"], "birthday");
    }

    #[tokio::test]
    async fn transfer_carries_balance() {
        let app = app().await;
        let from = start(&app, "ps-1").await;
        let to = start(&app, "ps-2").await;
        app.clock.advance_minutes(30);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{from}/transfer"),
            Some(json!({ "to_session_id": to })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["gaming_amount"], 1000);

        let (_, body) = send(&app, "GET", &format!("/api/v1/sessions/{to}"), None).await;
        assert_eq!(body["data"]["session"]["extra_charges"], 1000);
        assert_eq!(body["data"]["transfers"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn webhook_accepts_json_and_query() {
        let app = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/playstation/webhook",
            Some(json!({ "mac": "AA-BB-CC-DD-EE-01", "action": "connect" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["action"], "started");
        let session_id = body["sessionId"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "POST",
            "/playstation/webhook?mac=aa-bb-cc-dd-ee-01&action=connect",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body.get("action").is_none());

        app.clock.advance_minutes(30);
        let (_, body) = send(
            &app,
            "POST",
            "/playstation/webhook?mac=aa-bb-cc-dd-ee-01&action=disconnect",
            None,
        )
        .await;
        assert_eq!(body["action"], "ended");
        assert_eq!(body["sessionId"], session_id.as_str());

        let (_, body) = send(&app, "GET", "/playstation/connectivity", None).await;
        assert_eq!(body["data"][0]["state"], "down");
    }

    #[tokio::test]
    async fn webhook_rejects_bad_signals() {
        let app = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/playstation/webhook",
            Some(json!({ "mac": "aa:bb:cc:dd:ee:01" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &app,
            "POST",
            "/playstation/webhook",
            Some(json!({ "mac": "aa:bb:cc:dd:ee:77", "action": "connect" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn station_status_toggle() {
        let app = app().await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/v1/stations/ps-2/status",
            Some(json!({ "status": "maintenance" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "maintenance");

        let (status, _) = send(
            &app,
            "PUT",
            "/api/v1/stations/ps-2/status",
            Some(json!({ "status": "occupied" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let id = start(&app, "ps-1").await;
        let (_, body) = send(&app, "GET", "/api/v1/stations", None).await;
        let stations = body["data"].as_array().unwrap();
        let ps1 = stations.iter().find(|s| s["id"] == "ps-1").unwrap();
        assert_eq!(ps1["status"], "occupied");
        assert_eq!(ps1["live_session_id"], id.as_str());
    }

    #[tokio::test]
    async fn health_reflects_storage() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        app.repos.set_unavailable(true);
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/api-doc/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/playstation/webhook"].is_object());
    }
}
