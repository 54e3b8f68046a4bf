//! Gaming session domain entities
//!
//! A [`Session`] carries its lifecycle as an explicit [`SessionState`]
//! instead of nullable timestamps, so a paused-and-ended session cannot be
//! represented. Billable time is partitioned into [`Segment`]s, one per
//! contiguous span at a fixed rate and mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::station::Station;
use crate::domain::{DomainError, DomainResult, Piasters};

/// Player mode, each billed at its own hourly rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Single,
    Multi,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multi => "multi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Some(Self::Single),
            "multi" => Some(Self::Multi),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who opened the session. Only `Auto` sessions end on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartedBy {
    Manual,
    Auto,
}

impl StartedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "manual" => Some(Self::Manual),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

impl std::fmt::Display for StartedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Paused { paused_at: DateTime<Utc> },
    /// Terminal. `total_cost` is the gaming total (segments + extra charges,
    /// or a manual override); orders are kept separately on the session.
    Ended {
        ended_at: DateTime<Utc>,
        total_cost: Piasters,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused { .. } => "paused",
            Self::Ended { .. } => "ended",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub station_id: String,
    pub started_at: DateTime<Utc>,
    pub state: SessionState,
    /// Single rate captured when the session was opened
    pub hourly_rate_snapshot: Piasters,
    /// Food and drinks, never folded into the gaming total
    pub orders_cost: Piasters,
    /// Sum of charges and received transfer credits (may be negative)
    pub extra_charges: Piasters,
    /// Amount moved to another session when this one was transferred
    pub transferred_cost: Piasters,
    pub current_mode: GameMode,
    pub started_by: StartedBy,
    pub timer_minutes: Option<u32>,
    pub timer_warning_notified: bool,
    pub timer_notified: bool,
    pub cost_limit: Option<Piasters>,
    pub cost_limit_notified: bool,
    /// Monotonic; grows on resume (or on end while paused)
    pub total_paused_ms: i64,
    pub notes: Option<String>,
}

impl Session {
    pub fn new(station: &Station, started_by: StartedBy, started_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            station_id: station.id.clone(),
            started_at,
            state: SessionState::Active,
            hourly_rate_snapshot: station.hourly_rate_single,
            orders_cost: 0,
            extra_charges: 0,
            transferred_cost: 0,
            current_mode: GameMode::Single,
            started_by,
            timer_minutes: None,
            timer_warning_notified: false,
            timer_notified: false,
            cost_limit: None,
            cost_limit_notified: false,
            total_paused_ms: 0,
            notes: None,
        }
    }

    /// Not ended (active or paused)
    pub fn is_live(&self) -> bool {
        !matches!(self.state, SessionState::Ended { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, SessionState::Paused { .. })
    }

    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SessionState::Paused { paused_at } => Some(paused_at),
            _ => None,
        }
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SessionState::Ended { ended_at, .. } => Some(ended_at),
            _ => None,
        }
    }

    pub fn total_cost(&self) -> Option<Piasters> {
        match self.state {
            SessionState::Ended { total_cost, .. } => Some(total_cost),
            _ => None,
        }
    }

    /// What the customer still owes for this session once it has ended:
    /// gaming total plus orders, minus whatever was carried to another session.
    pub fn net_billed(&self) -> Option<Piasters> {
        self.total_cost()
            .map(|total| total + self.orders_cost - self.transferred_cost)
    }

    pub fn ensure_live(&self) -> DomainResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(DomainError::InvalidState(format!(
                "session {} has already ended",
                self.id
            )))
        }
    }

    pub fn pause(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        match self.state {
            SessionState::Active => {
                self.state = SessionState::Paused { paused_at: at };
                Ok(())
            }
            _ => Err(DomainError::InvalidState(format!(
                "cannot pause {} session {}",
                self.state.name(),
                self.id
            ))),
        }
    }

    /// Leave the paused state. Returns the pause length in milliseconds so the
    /// caller can attribute it to the open segment.
    pub fn resume(&mut self, at: DateTime<Utc>) -> DomainResult<i64> {
        let SessionState::Paused { paused_at } = self.state else {
            return Err(DomainError::InvalidState(format!(
                "cannot resume {} session {}",
                self.state.name(),
                self.id
            )));
        };
        let delta = (at - paused_at).num_milliseconds().max(0);
        self.total_paused_ms += delta;
        self.state = SessionState::Active;
        Ok(delta)
    }

    /// Move to `Ended`. A running pause is folded into `total_paused_ms`
    /// first; its length is returned (0 when the session was active).
    pub fn finish(&mut self, at: DateTime<Utc>, total_cost: Piasters) -> DomainResult<i64> {
        let folded = match self.state {
            SessionState::Active => 0,
            SessionState::Paused { paused_at } => {
                let delta = (at - paused_at).num_milliseconds().max(0);
                self.total_paused_ms += delta;
                delta
            }
            SessionState::Ended { .. } => {
                return Err(DomainError::InvalidState(format!(
                    "session {} has already ended",
                    self.id
                )))
            }
        };
        self.state = SessionState::Ended {
            ended_at: at,
            total_cost,
        };
        Ok(folded)
    }

    /// Changing the threshold re-arms both timer notifications.
    pub fn set_timer(&mut self, minutes: Option<u32>) {
        if self.timer_minutes != minutes {
            self.timer_minutes = minutes;
            self.timer_warning_notified = false;
            self.timer_notified = false;
        }
    }

    /// Changing the threshold re-arms the cost-limit notification.
    pub fn set_cost_limit(&mut self, limit: Option<Piasters>) {
        if self.cost_limit != limit {
            self.cost_limit = limit;
            self.cost_limit_notified = false;
        }
    }
}

/// Contiguous span of session time billed at one rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: String,
    pub session_id: String,
    /// Position within the session, starting at 0
    pub seq: i32,
    pub mode: GameMode,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub hourly_rate_snapshot: Piasters,
    /// Completed pauses that happened while this segment was open
    pub paused_ms: i64,
}

impl Segment {
    pub fn open(
        session_id: impl Into<String>,
        mode: GameMode,
        hourly_rate_snapshot: Piasters,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            seq: 0,
            mode,
            started_at: at,
            ended_at: None,
            hourly_rate_snapshot,
            paused_ms: 0,
        }
    }

    /// The segment that follows this one, starting at `at`
    pub fn successor(&self, mode: GameMode, hourly_rate_snapshot: Piasters, at: DateTime<Utc>) -> Self {
        Self {
            seq: self.seq + 1,
            ..Self::open(self.session_id.clone(), mode, hourly_rate_snapshot, at)
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn close(&mut self, at: DateTime<Utc>) {
        if self.ended_at.is_none() {
            self.ended_at = Some(at);
        }
    }
}

/// Manual adjustment (extra fee or discount) on a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    pub id: String,
    pub session_id: String,
    /// Signed; negative values are discounts
    pub amount: Piasters,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Charge {
    pub fn new(
        session_id: impl Into<String>,
        amount: Piasters,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            amount,
            reason,
            created_at: at,
        }
    }
}

/// Balance moved from a closing session to another live one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub id: String,
    pub from_session_id: String,
    pub to_session_id: String,
    pub from_station_id: String,
    pub gaming_amount: Piasters,
    pub orders_amount: Piasters,
    pub total_amount: Piasters,
    pub created_at: DateTime<Utc>,
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::station::StationStatus;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap()
    }

    fn sample_session() -> Session {
        let station = Station {
            id: "ps-1".into(),
            name: "PS5 #1".into(),
            mac_address: "aa:bb:cc:dd:ee:01".into(),
            hourly_rate_single: 2000,
            hourly_rate_multi: Some(3500),
            status: StationStatus::Available,
        };
        Session::new(&station, StartedBy::Manual, t0())
    }

    #[test]
    fn new_session_is_active_single() {
        let s = sample_session();
        assert!(s.is_live());
        assert!(!s.is_paused());
        assert_eq!(s.current_mode, GameMode::Single);
        assert_eq!(s.hourly_rate_snapshot, 2000);
        assert_eq!(s.total_cost(), None);
        assert_eq!(s.net_billed(), None);
    }

    #[test]
    fn pause_twice_is_rejected() {
        let mut s = sample_session();
        s.pause(t0()).unwrap();
        assert!(matches!(s.pause(t0()), Err(DomainError::InvalidState(_))));
    }

    #[test]
    fn resume_accumulates_paused_time() {
        let mut s = sample_session();
        s.pause(t0() + Duration::minutes(5)).unwrap();
        let delta = s.resume(t0() + Duration::minutes(15)).unwrap();
        assert_eq!(delta, 10 * 60_000);
        assert_eq!(s.total_paused_ms, 10 * 60_000);
        assert_eq!(s.state, SessionState::Active);
    }

    #[test]
    fn resume_requires_pause() {
        let mut s = sample_session();
        assert!(matches!(s.resume(t0()), Err(DomainError::InvalidState(_))));
    }

    #[test]
    fn finish_while_paused_folds_pause() {
        let mut s = sample_session();
        s.pause(t0() + Duration::minutes(30)).unwrap();
        let folded = s.finish(t0() + Duration::minutes(40), 1000).unwrap();
        assert_eq!(folded, 10 * 60_000);
        assert_eq!(s.total_paused_ms, 10 * 60_000);
        assert_eq!(s.ended_at(), Some(t0() + Duration::minutes(40)));
        assert_eq!(s.total_cost(), Some(1000));
        assert!(s.paused_at().is_none());
    }

    #[test]
    fn finish_twice_is_rejected() {
        let mut s = sample_session();
        s.finish(t0(), 0).unwrap();
        assert!(matches!(s.finish(t0(), 0), Err(DomainError::InvalidState(_))));
        assert!(s.ensure_live().is_err());
    }

    #[test]
    fn net_billed_subtracts_transferred_amount() {
        let mut s = sample_session();
        s.orders_cost = 500;
        s.transferred_cost = 3500;
        s.finish(t0(), 3000).unwrap();
        assert_eq!(s.net_billed(), Some(0));
    }

    #[test]
    fn changing_timer_rearms_notifications() {
        let mut s = sample_session();
        s.set_timer(Some(60));
        s.timer_warning_notified = true;
        s.timer_notified = true;

        s.set_timer(Some(60));
        assert!(s.timer_notified, "same threshold keeps the flag");

        s.set_timer(Some(90));
        assert!(!s.timer_notified);
        assert!(!s.timer_warning_notified);
    }

    #[test]
    fn changing_cost_limit_rearms_notification() {
        let mut s = sample_session();
        s.set_cost_limit(Some(5000));
        s.cost_limit_notified = true;
        s.set_cost_limit(Some(8000));
        assert!(!s.cost_limit_notified);
    }

    #[test]
    fn segment_close_is_idempotent() {
        let mut seg = Segment::open("s1", GameMode::Single, 2000, t0());
        assert!(seg.is_open());
        seg.close(t0() + Duration::minutes(10));
        seg.close(t0() + Duration::minutes(20));
        assert_eq!(seg.ended_at, Some(t0() + Duration::minutes(10)));
    }

    #[test]
    fn successor_continues_sequence() {
        let first = Segment::open("s1", GameMode::Single, 2000, t0());
        let next = first.successor(GameMode::Multi, 3500, t0() + Duration::minutes(30));
        assert_eq!(next.seq, 1);
        assert_eq!(next.session_id, "s1");
        assert_ne!(next.id, first.id);
        assert!(next.is_open());
    }

    #[test]
    fn enum_string_roundtrip() {
        assert_eq!(GameMode::from_str("MULTI"), Some(GameMode::Multi));
        assert_eq!(StartedBy::from_str("auto"), Some(StartedBy::Auto));
        assert_eq!(GameMode::from_str("coop"), None);
    }
}
