//! # Venue Billing
//!
//! Per-minute billing for console gaming stations. Sessions are started by
//! staff or automatically when a router reports a console coming online,
//! billed per segment at the rate snapshot taken when the segment opened,
//! and closed by staff, by disconnect, or by transfer onto another session.
//!
//! ## Architecture
//!
//! - **domain**: stations, sessions, segments, cost arithmetic, events
//! - **application**: billing engine, connectivity monitor, notifications
//! - **infrastructure**: SeaORM (sqlite) and in-memory repositories
//! - **interfaces**: REST API, connectivity webhook, SSE, Swagger UI
//! - **server**: runtime wiring and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{
    init_database, run_migrations, DatabaseConfig, InMemoryRepositoryProvider,
    SeaOrmRepositoryProvider,
};

pub use application::{
    create_event_bus, BillingEngine, ConnectivityMonitor, EventBus, Notifier, SharedEventBus,
};
pub use interfaces::http::create_router;
