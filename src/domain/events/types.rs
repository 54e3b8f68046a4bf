//! Notification events
//!
//! Informational payloads announced to displays and staff UI. Delivery is
//! best-effort; nothing in billing depends on an event arriving.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Piasters;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Notification {
    SessionStarted(SessionStartedEvent),
    SessionEnded(SessionEndedEvent),
    TimerWarning(TimerWarningEvent),
    TimerExpired(TimerExpiredEvent),
    CostLimitReached(CostLimitReachedEvent),
}

impl Notification {
    pub fn event_type(&self) -> &'static str {
        match self {
            Notification::SessionStarted(_) => "sessionStarted",
            Notification::SessionEnded(_) => "sessionEnded",
            Notification::TimerWarning(_) => "timerWarning",
            Notification::TimerExpired(_) => "timerExpired",
            Notification::CostLimitReached(_) => "costLimitReached",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Notification::SessionStarted(e) => &e.session_id,
            Notification::SessionEnded(e) => &e.session_id,
            Notification::TimerWarning(e) => &e.session_id,
            Notification::TimerExpired(e) => &e.session_id,
            Notification::CostLimitReached(e) => &e.session_id,
        }
    }

    pub fn station_id(&self) -> &str {
        match self {
            Notification::SessionStarted(e) => &e.station_id,
            Notification::SessionEnded(e) => &e.station_id,
            Notification::TimerWarning(e) => &e.station_id,
            Notification::TimerExpired(e) => &e.station_id,
            Notification::CostLimitReached(e) => &e.station_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStartedEvent {
    pub session_id: String,
    pub station_id: String,
    pub started_by: String,
    pub hourly_rate: Piasters,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEndedEvent {
    pub session_id: String,
    pub station_id: String,
    pub total_cost: Piasters,
    pub orders_cost: Piasters,
    pub transferred_cost: Piasters,
    pub elapsed_minutes: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerWarningEvent {
    pub session_id: String,
    pub station_id: String,
    pub minutes_remaining: i64,
    pub timer_minutes: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerExpiredEvent {
    pub session_id: String,
    pub station_id: String,
    pub timer_minutes: u32,
    pub elapsed_minutes: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLimitReachedEvent {
    pub session_id: String,
    pub station_id: String,
    pub cost_limit: Piasters,
    pub gaming_cost: Piasters,
    pub timestamp: DateTime<Utc>,
}

/// Wrapper for sending events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Notification,
}

impl EventMessage {
    pub fn new(event: Notification) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}
