//! Domain layer: stations, sessions, cost arithmetic and notification events

pub mod billing;
pub mod events;
pub mod repositories;
pub mod session;
pub mod station;

/// Monetary amount in piasters (1/100 of the display currency)
pub type Piasters = i64;

pub use billing::{compute_cost, CostBreakdown, SegmentCost};
pub use events::{EventMessage, Notification};
pub use repositories::{DomainResult, RepositoryProvider};
pub use session::{
    Charge, GameMode, Segment, Session, SessionChangeSet, SessionRepository, SessionState,
    StartedBy, Transfer,
};
pub use station::{normalize_mac, Station, StationRepository, StationStatus};

pub use crate::shared::errors::DomainError;
