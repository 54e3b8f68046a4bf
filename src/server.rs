//! Reusable server runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: storage and migrations, station
//! seeding, billing engine, connectivity monitor, session evaluator, REST API,
//! metrics and graceful shutdown. The CLI binary is a thin wrapper around it.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::application::{
    create_event_bus, start_session_evaluator, BillingEngine, ConnectivityMonitor,
    EventBusDispatcher, LogDispatcher, Notifier, SharedEventBus,
};
use crate::config::{AppConfig, DatabaseDriver, StationConfig};
use crate::domain::{DomainResult, RepositoryProvider, StationStatus};
use crate::infrastructure::{
    init_database, run_migrations, DatabaseConfig, InMemoryRepositoryProvider,
    SeaOrmRepositoryProvider,
};
use crate::interfaces::http::modules::metrics::describe_metrics;
use crate::interfaces::http::{create_router, AppState};
use crate::shared::clock::SystemClock;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true)
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running billing server.
///
/// ```rust,no_run
/// use venue_billing::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub engine: Arc<BillingEngine>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub repos: Arc<dyn RepositoryProvider>,
    pub event_bus: SharedEventBus,
    pub config: AppConfig,
    /// Address the API is bound to (resolves port 0)
    pub local_addr: SocketAddr,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
    evaluator_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// 1. Install the Prometheus recorder (once per process)
    /// 2. Open storage and run migrations
    /// 3. Seed stations from configuration
    /// 4. Wire notifier, engine and connectivity monitor
    /// 5. Start the session evaluator and the REST API
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting venue billing server...");

        let prometheus_handle = prometheus_handle();

        // ── Storage ────────────────────────────────────────────
        let (repos, db): (Arc<dyn RepositoryProvider>, Option<DatabaseConnection>) =
            match app_cfg.database.driver {
                DatabaseDriver::Memory => {
                    warn!("⚠️ In-memory storage: sessions are lost on restart");
                    (Arc::new(InMemoryRepositoryProvider::new()), None)
                }
                DatabaseDriver::Sqlite => {
                    if let Some(parent) = std::path::Path::new(&app_cfg.database.sqlite.path).parent() {
                        if !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent)?;
                        }
                    }
                    let db_config = DatabaseConfig {
                        url: app_cfg.database.connection_url(),
                        max_connections: None,
                    };
                    let db = init_database(&db_config).await?;
                    if opts.auto_migrate {
                        run_migrations(&db).await?;
                    }
                    (Arc::new(SeaOrmRepositoryProvider::new(db.clone())), Some(db))
                }
            };

        let seeded = seed_stations(repos.as_ref(), &app_cfg.stations).await?;
        info!(stations = seeded, "🎮 Stations seeded from configuration");
        let live = live_session_count(repos.as_ref()).await?;
        if live > 0 {
            info!(live, "▶️ Live sessions carried over from storage");
        }

        // ── Notifications ──────────────────────────────────────
        let event_bus = create_event_bus(app_cfg.notifications.event_bus_capacity);
        let mut notifier =
            Notifier::new().with_dispatcher(Arc::new(EventBusDispatcher::new(event_bus.clone())));
        if app_cfg.notifications.log_events {
            notifier = notifier.with_dispatcher(Arc::new(LogDispatcher));
        }
        info!(dispatchers = notifier.dispatcher_count(), "🔔 Notifier ready");

        // ── Engine & monitor ───────────────────────────────────
        let engine = Arc::new(
            BillingEngine::new(repos.clone(), Arc::new(SystemClock), notifier)
                .with_timer_warning(app_cfg.billing.timer_warning_minutes),
        );
        let monitor = Arc::new(ConnectivityMonitor::new(repos.clone(), engine.clone()));

        // ── Background tasks ───────────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let evaluator_task = start_session_evaluator(
            engine.clone(),
            shutdown_signal.clone(),
            app_cfg.billing.evaluation_interval_secs,
        );

        // ── REST API ───────────────────────────────────────────
        let router = create_router(
            AppState {
                engine: engine.clone(),
                monitor: monitor.clone(),
                repos: repos.clone(),
                event_bus: event_bus.clone(),
                started_at: Arc::new(Instant::now()),
            },
            prometheus_handle,
        );

        let api_addr = format!("{}:{}", app_cfg.server.api_host, app_cfg.server.api_port);
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API received shutdown signal");
        });
        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Venue billing server started");

        Ok(Self {
            engine,
            monitor,
            repos,
            event_bus,
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
            evaluator_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGINT / SIGTERM
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to stop after shutdown has been triggered. Bounded
    /// by `server.shutdown_timeout`.
    pub async fn wait(self) {
        let Self {
            shutdown,
            api_task,
            evaluator_task,
            db,
            ..
        } = self;

        let finished = shutdown
            .shutdown_with_cleanup(|| async move {
                if let Err(e) = api_task.await {
                    error!("REST API task panicked: {}", e);
                }
                if let Err(e) = evaluator_task.await {
                    error!("Session evaluator task panicked: {}", e);
                }
            })
            .await;
        if !finished {
            warn!("Some tasks were still running at shutdown");
        }

        if let Some(db) = db {
            match db.close().await {
                Ok(()) => info!("✅ Database connection closed"),
                Err(e) => warn!("Error closing database connection: {}", e),
            }
        }

        info!("👋 Venue billing server shutdown complete");
    }

    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can only be installed once per process; restarts in
/// the same process reuse it. `None` if another recorder is already set.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                describe_metrics();
                info!("📊 Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Prometheus recorder unavailable, /metrics disabled");
                None
            }
        })
        .clone()
}

/// Upsert configured stations. A station keeps `occupied` while a session is
/// still live on it; `maintenance` from the file always wins.
pub async fn seed_stations(
    repos: &dyn RepositoryProvider,
    stations: &[StationConfig],
) -> Result<usize, Box<dyn std::error::Error>> {
    for cfg in stations {
        let mut station = cfg.to_station()?;
        let live = repos.sessions().find_live_for_station(&station.id).await?;
        match (&live, station.status) {
            (Some(session), StationStatus::Maintenance) => warn!(
                station_id = %station.id,
                session_id = %session.id,
                "Station set to maintenance while a session is live"
            ),
            (Some(_), _) => station.status = StationStatus::Occupied,
            (None, _) => {}
        }
        repos.stations().upsert(station).await?;
    }
    Ok(stations.len())
}

/// Initialize tracing from the application config. Call once at process
/// startup, before [`ServerHandle::start`]. `RUST_LOG` overrides the level.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

async fn live_session_count(repos: &dyn RepositoryProvider) -> DomainResult<usize> {
    Ok(repos.sessions().find_live().await?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::StartOptions;
    use crate::domain::StartedBy;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn station_cfg(id: &str, mac: &str, maintenance: bool) -> StationConfig {
        StationConfig {
            id: id.into(),
            name: None,
            mac_address: mac.into(),
            hourly_rate_single: 2000,
            hourly_rate_multi: None,
            maintenance,
        }
    }

    #[tokio::test]
    async fn seeding_keeps_occupied_stations_occupied() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let stations = vec![
            station_cfg("ps-1", "aa:bb:cc:dd:ee:01", false),
            station_cfg("ps-2", "aa:bb:cc:dd:ee:02", false),
        ];
        seed_stations(repos.as_ref(), &stations).await.unwrap();

        let engine = BillingEngine::new(repos.clone(), Arc::new(SystemClock), Notifier::new());
        engine
            .start_session("ps-1", StartedBy::Manual, StartOptions::default())
            .await
            .unwrap();

        // Restart with the same file: ps-1 still has its live session.
        let seeded = seed_stations(repos.as_ref(), &stations).await.unwrap();
        assert_eq!(seeded, 2);
        let ps1 = repos.stations().find_by_id("ps-1").await.unwrap().unwrap();
        let ps2 = repos.stations().find_by_id("ps-2").await.unwrap().unwrap();
        assert_eq!(ps1.status, StationStatus::Occupied);
        assert_eq!(ps2.status, StationStatus::Available);
        assert_eq!(live_session_count(repos.as_ref()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn seeding_applies_maintenance_flag() {
        let repos = InMemoryRepositoryProvider::new();
        seed_stations(&repos, &[station_cfg("ps-3", "AA-BB-CC-DD-EE-03", true)])
            .await
            .unwrap();
        let ps3 = repos.stations().find_by_id("ps-3").await.unwrap().unwrap();
        assert_eq!(ps3.status, StationStatus::Maintenance);
        assert_eq!(ps3.mac_address, "aa:bb:cc:dd:ee:03");
    }

    #[tokio::test]
    async fn serves_health_and_shuts_down() {
        let mut config = AppConfig::default();
        config.server.api_host = "127.0.0.1".into();
        config.server.api_port = 0;
        config.server.shutdown_timeout = 5;
        config.database.driver = DatabaseDriver::Memory;
        config.stations = vec![station_cfg("ps-1", "aa:bb:cc:dd:ee:01", false)];

        let handle = ServerHandle::start(ServerOptions {
            config,
            auto_migrate: false,
        })
        .await
        .unwrap();
        assert!(handle.is_running());

        let mut stream = tokio::net::TcpStream::connect(handle.local_addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("\"status\":\"ok\""));

        tokio::time::timeout(std::time::Duration::from_secs(10), handle.shutdown())
            .await
            .expect("server stops within the shutdown timeout");
    }
}
