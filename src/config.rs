//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/venue-billing/config.toml`).
//! Every section is optional; a missing file yields the defaults.
//!
//! ```toml
//! [server]
//! api_port = 8080
//!
//! [database]
//! driver = "sqlite"
//! [database.sqlite]
//! path = "/var/lib/venue-billing/billing.db"
//!
//! [billing]
//! evaluation_interval_secs = 30
//! timer_warning_minutes = 5
//!
//! [[stations]]
//! id = "ps-1"
//! name = "PS5 #1"
//! mac_address = "aa:bb:cc:dd:ee:01"
//! hourly_rate_single = 2000
//! hourly_rate_multi = 3500
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{normalize_mac, Piasters, Station, StationStatus};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `~/.config/venue-billing/config.toml`, or `./config.toml` when no config
/// directory is known.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("venue-billing").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn default_sqlite_path() -> String {
    dirs_next::data_dir()
        .map(|dir| dir.join("venue-billing").join("billing.db"))
        .unwrap_or_else(|| PathBuf::from("venue-billing.db"))
        .to_string_lossy()
        .into_owned()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub logging: LoggingConfig,
    pub billing: BillingConfig,
    pub notifications: NotificationsConfig,
    pub stations: Vec<StationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    /// Nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub driver: DatabaseDriver,
    pub sqlite: SqliteSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteSettings {
    pub path: String,
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            path: default_sqlite_path(),
        }
    }
}

impl DatabaseSettings {
    /// Connection URL for the sqlite driver; creates the file when missing.
    pub fn connection_url(&self) -> String {
        match self.driver {
            DatabaseDriver::Sqlite => format!("sqlite://{}?mode=rwc", self.sqlite.path),
            DatabaseDriver::Memory => "memory".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `RUST_LOG` syntax; the environment variable wins when set
    pub level: String,
    /// text | json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub evaluation_interval_secs: u64,
    /// 0 disables the timer warning
    pub timer_warning_minutes: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_secs: 30,
            timer_warning_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub event_bus_capacity: usize,
    /// Also write every notification to the log
    pub log_events: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: 256,
            log_events: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub mac_address: String,
    pub hourly_rate_single: Piasters,
    #[serde(default)]
    pub hourly_rate_multi: Option<Piasters>,
    #[serde(default)]
    pub maintenance: bool,
}

impl StationConfig {
    /// Domain station with a normalized MAC. Status is `available` unless
    /// flagged for maintenance; the caller reconciles occupancy.
    pub fn to_station(&self) -> Result<Station, ConfigError> {
        let mac_address = normalize_mac(&self.mac_address).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "station {}: invalid MAC address '{}'",
                self.id, self.mac_address
            ))
        })?;
        Ok(Station {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            mac_address,
            hourly_rate_single: self.hourly_rate_single,
            hourly_rate_multi: self.hourly_rate_multi,
            status: if self.maintenance {
                StationStatus::Maintenance
            } else {
                StationStatus::Available
            },
        })
    }
}

impl AppConfig {
    /// Read and validate `path`. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.billing.evaluation_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "billing.evaluation_interval_secs must be greater than zero".into(),
            ));
        }
        if self.notifications.event_bus_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notifications.event_bus_capacity must be greater than zero".into(),
            ));
        }
        if !matches!(self.logging.format.to_lowercase().as_str(), "text" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            )));
        }

        let mut ids = HashSet::new();
        let mut macs = HashSet::new();
        for station in &self.stations {
            if station.id.trim().is_empty() {
                return Err(ConfigError::Invalid("station id cannot be empty".into()));
            }
            if !ids.insert(station.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate station id '{}'",
                    station.id
                )));
            }
            if station.hourly_rate_single < 0 || station.hourly_rate_multi.is_some_and(|r| r < 0) {
                return Err(ConfigError::Invalid(format!(
                    "station {}: hourly rates cannot be negative",
                    station.id
                )));
            }
            let mac = station.to_station()?.mac_address;
            if !macs.insert(mac.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate MAC address {mac} (station {})",
                    station.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIONS: &str = r#"
        [[stations]]
        id = "ps-1"
        mac_address = "AA-BB-CC-DD-EE-01"
        hourly_rate_single = 2000
        hourly_rate_multi = 3500

        [[stations]]
        id = "ps-2"
        name = "Corner PS4"
        mac_address = "aa:bb:cc:dd:ee:02"
        hourly_rate_single = 1500
        maintenance = true
    "#;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.server.api_port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.billing.timer_warning_minutes, 5);
        assert!(config.stations.is_empty());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/venue-billing.toml")).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parses_sections_and_stations() {
        let raw = format!(
            r#"
            [server]
            api_port = 9090

            [database]
            driver = "memory"

            [logging]
            format = "json"

            [billing]
            evaluation_interval_secs = 10
            {STATIONS}
            "#
        );
        let config = AppConfig::from_toml(&raw).unwrap();
        assert_eq!(config.server.api_port, 9090);
        assert_eq!(config.server.api_host, "0.0.0.0");
        assert_eq!(config.database.driver, DatabaseDriver::Memory);
        assert_eq!(config.billing.evaluation_interval_secs, 10);
        assert_eq!(config.billing.timer_warning_minutes, 5);

        let ps1 = config.stations[0].to_station().unwrap();
        assert_eq!(ps1.mac_address, "aa:bb:cc:dd:ee:01");
        assert_eq!(ps1.name, "ps-1");
        assert_eq!(ps1.hourly_rate_multi, Some(3500));

        let ps2 = config.stations[1].to_station().unwrap();
        assert_eq!(ps2.status, StationStatus::Maintenance);
        assert_eq!(ps2.hourly_rate_multi, None);
    }

    #[test]
    fn sqlite_url_creates_file() {
        let mut settings = DatabaseSettings::default();
        settings.sqlite.path = "/tmp/billing.db".into();
        assert_eq!(settings.connection_url(), "sqlite:///tmp/billing.db?mode=rwc");
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            "[billing]\nevaluation_interval_secs = 0",
            "[notifications]\nevent_bus_capacity = 0",
            "[logging]\nformat = \"xml\"",
            "[[stations]]\nid = \"a\"\nmac_address = \"  \"\nhourly_rate_single = 1",
            "[[stations]]\nid = \"a\"\nmac_address = \"aa:bb:cc:dd:ee:01\"\nhourly_rate_single = -1",
        ];
        for raw in cases {
            assert!(
                matches!(AppConfig::from_toml(raw), Err(ConfigError::Invalid(_))),
                "expected rejection for {raw:?}"
            );
        }
    }

    #[test]
    fn rejects_duplicates() {
        let dup_id = r#"
            [[stations]]
            id = "ps-1"
            mac_address = "aa:bb:cc:dd:ee:01"
            hourly_rate_single = 1
            [[stations]]
            id = "ps-1"
            mac_address = "aa:bb:cc:dd:ee:02"
            hourly_rate_single = 1
        "#;
        let dup_mac = r#"
            [[stations]]
            id = "ps-1"
            mac_address = "aa:bb:cc:dd:ee:01"
            hourly_rate_single = 1
            [[stations]]
            id = "ps-2"
            mac_address = "AA:BB:CC:DD:EE:01"
            hourly_rate_single = 1
        "#;
        assert!(matches!(AppConfig::from_toml(dup_id), Err(ConfigError::Invalid(_))));
        assert!(matches!(AppConfig::from_toml(dup_mac), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            AppConfig::from_toml("[server\napi_port = 1"),
            Err(ConfigError::Parse(_))
        ));
    }
}
