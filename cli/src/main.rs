//! Venue billing CLI server
//!
//! ```sh
//! # Run with default config (~/.config/venue-billing/config.toml)
//! venue-billing
//!
//! # Custom config path
//! venue-billing --config /etc/venue-billing/config.toml
//!
//! # Validate config without starting
//! venue-billing --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use venue_billing::config::AppConfig;
use venue_billing::server::{init_tracing, ServerHandle, ServerOptions};

/// Per-minute billing server for console gaming stations.
#[derive(Parser, Debug)]
#[command(
    name = "venue-billing",
    version,
    about = "Session billing for console gaming stations",
    long_about = "REST API, router connectivity webhook and live notification stream \
                  for billing console gaming sessions.\n\n\
                  Default config: ~/.config/venue-billing/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "VENUE_BILLING_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(venue_billing::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) if cli.check => {
            eprintln!("❌ Invalid configuration in {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config from {}: {}", config_path.display(), e);
            return Err(e.into());
        }
    };

    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if !cli.check {
        init_tracing(&config);
        info!("Configuration loaded from {}", config_path.display());
    }

    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
        config.server.api_port = port;
    }

    if cli.check {
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}:{}", config.server.api_host, config.server.api_port);
        println!("   Database    : {}", config.database.connection_url());
        println!("   Log level   : {}", config.logging.level);
        println!("   Stations    : {}", config.stations.len());
        return Ok(());
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await?;

    handle.install_signal_handler();
    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
