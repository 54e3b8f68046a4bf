//! Gaming station domain entity

use serde::{Deserialize, Serialize};

use crate::domain::Piasters;

/// Station availability as seen by staff and the connectivity monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    #[default]
    Available,
    Occupied,
    /// Out of service: ignored by connectivity, cannot start sessions
    Maintenance,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "available" => Some(Self::Available),
            "occupied" => Some(Self::Occupied),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }
}

impl std::fmt::Display for StationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rentable console station
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub id: String,
    pub name: String,
    /// Normalized (lowercase, colon separated) MAC of the console
    pub mac_address: String,
    /// Hourly rate for single-player mode, in piasters
    pub hourly_rate_single: Piasters,
    /// Hourly rate for multiplayer mode; `None` bills multi at the single rate
    pub hourly_rate_multi: Option<Piasters>,
    pub status: StationStatus,
}

impl Station {
    pub fn is_under_maintenance(&self) -> bool {
        self.status == StationStatus::Maintenance
    }

    pub fn rate_for(&self, mode: crate::domain::GameMode) -> Piasters {
        match mode {
            crate::domain::GameMode::Single => self.hourly_rate_single,
            crate::domain::GameMode::Multi => {
                self.hourly_rate_multi.unwrap_or(self.hourly_rate_single)
            }
        }
    }
}

/// Normalize a MAC address for lookups: trims, lowercases and turns `-`
/// separators into `:`. Returns `None` for an empty input.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let mac = raw.trim().to_ascii_lowercase().replace('-', ":");
    if mac.is_empty() {
        None
    } else {
        Some(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GameMode;

    fn station(multi: Option<Piasters>) -> Station {
        Station {
            id: "ps-1".into(),
            name: "PS5 #1".into(),
            mac_address: "aa:bb:cc:dd:ee:01".into(),
            hourly_rate_single: 2000,
            hourly_rate_multi: multi,
            status: StationStatus::Available,
        }
    }

    #[test]
    fn multi_rate_used_when_defined() {
        let s = station(Some(3500));
        assert_eq!(s.rate_for(GameMode::Single), 2000);
        assert_eq!(s.rate_for(GameMode::Multi), 3500);
    }

    #[test]
    fn multi_falls_back_to_single_rate() {
        assert_eq!(station(None).rate_for(GameMode::Multi), 2000);
    }

    #[test]
    fn mac_normalization() {
        assert_eq!(
            normalize_mac("  AA-BB-CC-DD-EE-01 ").as_deref(),
            Some("aa:bb:cc:dd:ee:01")
        );
        assert_eq!(normalize_mac("   "), None);
    }

    #[test]
    fn status_parsing() {
        assert_eq!(StationStatus::from_str("Maintenance"), Some(StationStatus::Maintenance));
        assert_eq!(StationStatus::from_str("broken"), None);
        assert_eq!(StationStatus::Occupied.to_string(), "occupied");
    }
}
