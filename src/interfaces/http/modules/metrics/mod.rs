//! Prometheus scrape endpoint, HTTP metrics middleware and metric descriptions

pub mod handlers;
pub mod middleware;

pub use handlers::{describe_metrics, prometheus_metrics, MetricsState};
pub use middleware::http_metrics_middleware;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
