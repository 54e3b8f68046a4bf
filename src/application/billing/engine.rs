//! Billing engine
//!
//! Owns the session state machine. Every mutation:
//! 1. takes the station lock(s) involved,
//! 2. reads committed state and validates,
//! 3. writes one [`SessionChangeSet`] through `SessionRepository::commit`,
//! 4. then performs best-effort follow-ups (station status, notifications).
//!
//! A failure before step 3 leaves the store untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use super::locks::StationLocks;
use crate::application::notifications::Notifier;
use crate::domain::events::{
    CostLimitReachedEvent, Notification, SessionEndedEvent, SessionStartedEvent,
    TimerExpiredEvent, TimerWarningEvent,
};
use crate::domain::{
    compute_cost, Charge, CostBreakdown, DomainError, DomainResult, GameMode, Piasters,
    RepositoryProvider, Segment, Session, SessionChangeSet, StartedBy, Station, StationStatus,
    Transfer,
};
use crate::shared::clock::SharedClock;

pub const SESSIONS_STARTED_TOTAL: &str = "billing_sessions_started_total";
pub const SESSIONS_ENDED_TOTAL: &str = "billing_sessions_ended_total";

/// A session-keyed operation re-reads the session after locking its station;
/// if a concurrent station switch moved it, the lock is retaken this many times.
const MAX_LOCK_ATTEMPTS: usize = 5;

/// Optional thresholds applied when a session opens
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    pub timer_minutes: Option<u32>,
    pub cost_limit: Option<Piasters>,
}

/// A live session together with its cost right now
#[derive(Debug, Clone)]
pub struct LiveSession {
    pub session: Session,
    pub cost: CostBreakdown,
}

/// Everything recorded for one session
#[derive(Debug, Clone)]
pub struct SessionDetails {
    pub session: Session,
    pub segments: Vec<Segment>,
    pub charges: Vec<Charge>,
    pub transfers: Vec<Transfer>,
    pub cost: CostBreakdown,
}

/// Result of ending a session
#[derive(Debug, Clone)]
pub struct EndedSession {
    pub session: Session,
    pub total_cost: Piasters,
    pub orders_cost: Piasters,
    pub net_billed: Piasters,
    pub elapsed_minutes: i64,
}

/// A station and the session currently running on it
#[derive(Debug, Clone)]
pub struct StationOverview {
    pub station: Station,
    pub live_session_id: Option<String>,
}

pub struct BillingEngine {
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
    notifier: Notifier,
    locks: StationLocks,
    timer_warning_minutes: u32,
}

impl BillingEngine {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: SharedClock, notifier: Notifier) -> Self {
        Self {
            repos,
            clock,
            notifier,
            locks: StationLocks::new(),
            timer_warning_minutes: 0,
        }
    }

    /// Warn this many minutes before a timer runs out (0 disables the warning)
    pub fn with_timer_warning(mut self, minutes: u32) -> Self {
        self.timer_warning_minutes = minutes;
        self
    }

    pub fn repos(&self) -> &Arc<dyn RepositoryProvider> {
        &self.repos
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Lifecycle ──────────────────────────────────────────────

    pub async fn start_session(
        &self,
        station_id: &str,
        started_by: StartedBy,
        options: StartOptions,
    ) -> DomainResult<Session> {
        validate_timer(options.timer_minutes)?;
        validate_cost_limit(options.cost_limit)?;

        let _guard = self.locks.lock(station_id).await;

        let station = self.load_station(station_id).await?;
        if station.is_under_maintenance() {
            return Err(DomainError::InvalidState(format!(
                "station {} is under maintenance",
                station.id
            )));
        }
        if let Some(live) = self
            .repos
            .sessions()
            .find_live_for_station(&station.id)
            .await?
        {
            return Err(DomainError::Conflict(format!(
                "station {} already has live session {}",
                station.id, live.id
            )));
        }

        let now = self.clock.now();
        let mut session = Session::new(&station, started_by, now);
        session.set_timer(options.timer_minutes);
        session.set_cost_limit(options.cost_limit);
        let segment = Segment::open(&session.id, GameMode::Single, station.hourly_rate_single, now);

        self.repos
            .sessions()
            .commit(SessionChangeSet::new().session(session.clone()).segment(segment))
            .await?;

        info!(
            session_id = %session.id,
            station_id = %station.id,
            started_by = %started_by,
            hourly_rate = station.hourly_rate_single,
            "🎮 Session started"
        );
        metrics::counter!(SESSIONS_STARTED_TOTAL, "started_by" => started_by.as_str()).increment(1);

        self.set_station_status(&station.id, StationStatus::Occupied).await;
        self.notifier
            .notify(Notification::SessionStarted(SessionStartedEvent {
                session_id: session.id.clone(),
                station_id: station.id.clone(),
                started_by: started_by.to_string(),
                hourly_rate: station.hourly_rate_single,
                timestamp: now,
            }));

        Ok(session)
    }

    pub async fn pause_session(&self, session_id: &str) -> DomainResult<Session> {
        let (_guard, mut session) = self.lock_session(session_id).await?;

        session.pause(self.clock.now())?;
        self.repos
            .sessions()
            .commit(SessionChangeSet::new().session(session.clone()))
            .await?;

        info!(session_id, station_id = %session.station_id, "⏸ Session paused");
        Ok(session)
    }

    pub async fn resume_session(&self, session_id: &str) -> DomainResult<Session> {
        let (_guard, mut session) = self.lock_session(session_id).await?;
        let segments = self.repos.sessions().segments(session_id).await?;

        let delta = session.resume(self.clock.now())?;
        let mut changes = SessionChangeSet::new().session(session.clone());
        if let Some(mut open) = open_segment(&segments) {
            open.paused_ms += delta;
            changes = changes.segment(open);
        }
        self.repos.sessions().commit(changes).await?;

        info!(
            session_id,
            station_id = %session.station_id,
            paused_ms = delta,
            "▶ Session resumed"
        );
        Ok(session)
    }

    /// Close the running segment and open one billed at the new mode's rate.
    pub async fn switch_mode(&self, session_id: &str, mode: GameMode) -> DomainResult<Session> {
        let (_guard, mut session) = self.lock_session(session_id).await?;

        session.ensure_live()?;
        if session.is_paused() {
            return Err(DomainError::InvalidState(format!(
                "session {session_id} is paused; resume before switching mode"
            )));
        }
        if session.current_mode == mode {
            return Err(DomainError::InvalidState(format!(
                "session {session_id} is already in {mode} mode"
            )));
        }

        let station = self.load_station(&session.station_id).await?;
        let rate = station.rate_for(mode);
        let segments = self.repos.sessions().segments(session_id).await?;
        let now = self.clock.now();

        let mut changes = SessionChangeSet::new();
        let next = match open_segment(&segments) {
            Some(mut open) => {
                open.close(now);
                let next = open.successor(mode, rate, now);
                changes = changes.segment(open);
                next
            }
            None => {
                let mut next = Segment::open(session_id, mode, rate, now);
                next.seq = segments.last().map(|s| s.seq + 1).unwrap_or(0);
                next
            }
        };

        session.current_mode = mode;
        self.repos
            .sessions()
            .commit(changes.segment(next).session(session.clone()))
            .await?;

        info!(
            session_id,
            station_id = %session.station_id,
            mode = %mode,
            hourly_rate = rate,
            "🔀 Mode switched"
        );
        Ok(session)
    }

    /// End a live session. `custom_total` replaces the computed gaming total.
    pub async fn end_session(
        &self,
        session_id: &str,
        custom_total: Option<Piasters>,
    ) -> DomainResult<EndedSession> {
        if matches!(custom_total, Some(total) if total < 0) {
            return Err(DomainError::Validation(
                "custom total cost cannot be negative".into(),
            ));
        }

        let (_guard, mut session) = self.lock_session(session_id).await?;
        session.ensure_live()?;

        let segments = self.repos.sessions().segments(session_id).await?;
        let now = self.clock.now();
        let cost = compute_cost(&session, &segments, now);
        let total_cost = custom_total.unwrap_or(cost.gaming_cost);

        let closed = close_out(&mut session, &segments, now, total_cost)?;
        let mut changes = SessionChangeSet::new().session(session.clone());
        if let Some(segment) = closed {
            changes = changes.segment(segment);
        }
        self.repos.sessions().commit(changes).await?;

        self.after_end(&session, &cost, now).await;

        Ok(EndedSession {
            total_cost,
            orders_cost: session.orders_cost,
            net_billed: session.net_billed().unwrap_or(total_cost),
            elapsed_minutes: cost.elapsed_minutes,
            session,
        })
    }

    /// Close `from_id` and carry its balance onto `to_id`.
    pub async fn transfer_session(
        &self,
        from_id: &str,
        to_id: &str,
        include_orders: bool,
    ) -> DomainResult<Transfer> {
        if from_id == to_id {
            return Err(DomainError::Validation(
                "cannot transfer a session onto itself".into(),
            ));
        }

        let (_guards, mut from, mut to) = self.lock_session_pair(from_id, to_id).await?;
        from.ensure_live()?;
        to.ensure_live()?;

        let segments = self.repos.sessions().segments(from_id).await?;
        let now = self.clock.now();
        let cost = compute_cost(&from, &segments, now);
        let orders_amount = if include_orders { from.orders_cost } else { 0 };

        let transfer = Transfer {
            id: uuid::Uuid::new_v4().to_string(),
            from_session_id: from.id.clone(),
            to_session_id: to.id.clone(),
            from_station_id: from.station_id.clone(),
            gaming_amount: cost.gaming_cost,
            orders_amount,
            total_amount: cost.gaming_cost + orders_amount,
            created_at: now,
        };

        let closed = close_out(&mut from, &segments, now, cost.gaming_cost)?;
        from.transferred_cost = transfer.total_amount;
        to.extra_charges += transfer.total_amount;

        let mut changes = SessionChangeSet::new()
            .session(from.clone())
            .session(to.clone())
            .transfer(transfer.clone());
        if let Some(segment) = closed {
            changes = changes.segment(segment);
        }
        self.repos.sessions().commit(changes).await?;

        info!(
            from_session = %from.id,
            to_session = %to.id,
            from_station = %from.station_id,
            to_station = %to.station_id,
            gaming_amount = transfer.gaming_amount,
            orders_amount = transfer.orders_amount,
            "💸 Session transferred"
        );
        self.after_end(&from, &cost, now).await;

        Ok(transfer)
    }

    /// Move a live session to another station. Segments and rate snapshots
    /// are kept as they are.
    pub async fn switch_station(
        &self,
        session_id: &str,
        new_station_id: &str,
    ) -> DomainResult<Session> {
        let (_guards, mut session) = self
            .lock_session_with(session_id, Some(new_station_id))
            .await?;
        session.ensure_live()?;

        let old_station_id = session.station_id.clone();
        if old_station_id == new_station_id {
            return Err(DomainError::InvalidState(format!(
                "session {session_id} is already on station {new_station_id}"
            )));
        }

        let target = self.load_station(new_station_id).await?;
        if target.is_under_maintenance() {
            return Err(DomainError::InvalidState(format!(
                "station {} is under maintenance",
                target.id
            )));
        }
        if let Some(live) = self
            .repos
            .sessions()
            .find_live_for_station(&target.id)
            .await?
        {
            return Err(DomainError::Conflict(format!(
                "station {} already has live session {}",
                target.id, live.id
            )));
        }

        session.station_id = target.id.clone();
        self.repos
            .sessions()
            .commit(SessionChangeSet::new().session(session.clone()))
            .await?;

        info!(
            session_id,
            from_station = %old_station_id,
            to_station = %target.id,
            "🔁 Session moved to another station"
        );
        self.set_station_status(&old_station_id, StationStatus::Available)
            .await;
        self.set_station_status(&target.id, StationStatus::Occupied)
            .await;

        Ok(session)
    }

    // ── Adjustments ────────────────────────────────────────────

    /// Signed adjustment; negative amounts are discounts.
    pub async fn add_charge(
        &self,
        session_id: &str,
        amount: Piasters,
        reason: Option<String>,
    ) -> DomainResult<Charge> {
        if amount == 0 {
            return Err(DomainError::Validation("charge amount cannot be zero".into()));
        }

        let (_guard, mut session) = self.lock_session(session_id).await?;
        session.ensure_live()?;

        let charge = Charge::new(session_id, amount, normalize_text(reason), self.clock.now());
        session.extra_charges += amount;
        self.repos
            .sessions()
            .commit(
                SessionChangeSet::new()
                    .session(session.clone())
                    .add_charge(charge.clone()),
            )
            .await?;

        info!(session_id, amount, extra_charges = session.extra_charges, "Charge added");
        Ok(charge)
    }

    pub async fn remove_charge(&self, session_id: &str, charge_id: &str) -> DomainResult<Session> {
        let (_guard, mut session) = self.lock_session(session_id).await?;
        session.ensure_live()?;

        let charge = self
            .repos
            .sessions()
            .charges(session_id)
            .await?
            .into_iter()
            .find(|c| c.id == charge_id)
            .ok_or_else(|| DomainError::not_found("Charge", "id", charge_id))?;

        session.extra_charges -= charge.amount;
        self.repos
            .sessions()
            .commit(
                SessionChangeSet::new()
                    .session(session.clone())
                    .remove_charge(&charge.id),
            )
            .await?;

        info!(session_id, charge_id, amount = charge.amount, "Charge removed");
        Ok(session)
    }

    /// Food and drink; kept apart from the gaming total.
    pub async fn record_order(&self, session_id: &str, amount: Piasters) -> DomainResult<Session> {
        if amount <= 0 {
            return Err(DomainError::Validation("order amount must be positive".into()));
        }

        let (_guard, mut session) = self.lock_session(session_id).await?;
        session.ensure_live()?;

        session.orders_cost += amount;
        self.repos
            .sessions()
            .commit(SessionChangeSet::new().session(session.clone()))
            .await?;

        debug!(session_id, amount, orders_cost = session.orders_cost, "Order recorded");
        Ok(session)
    }

    pub async fn set_timer(&self, session_id: &str, minutes: Option<u32>) -> DomainResult<Session> {
        validate_timer(minutes)?;
        let (_guard, mut session) = self.lock_session(session_id).await?;
        session.ensure_live()?;

        session.set_timer(minutes);
        self.repos
            .sessions()
            .commit(SessionChangeSet::new().session(session.clone()))
            .await?;

        info!(session_id, timer_minutes = ?minutes, "⏱ Timer set");
        Ok(session)
    }

    pub async fn set_cost_limit(
        &self,
        session_id: &str,
        limit: Option<Piasters>,
    ) -> DomainResult<Session> {
        validate_cost_limit(limit)?;
        let (_guard, mut session) = self.lock_session(session_id).await?;
        session.ensure_live()?;

        session.set_cost_limit(limit);
        self.repos
            .sessions()
            .commit(SessionChangeSet::new().session(session.clone()))
            .await?;

        info!(session_id, cost_limit = ?limit, "Cost limit set");
        Ok(session)
    }

    /// Free text; editable after the session ended as well.
    pub async fn set_notes(&self, session_id: &str, notes: Option<String>) -> DomainResult<Session> {
        let (_guard, mut session) = self.lock_session(session_id).await?;

        session.notes = normalize_text(notes);
        self.repos
            .sessions()
            .commit(SessionChangeSet::new().session(session.clone()))
            .await?;

        Ok(session)
    }

    // ── Queries ────────────────────────────────────────────────

    pub async fn get_session(&self, session_id: &str) -> DomainResult<Session> {
        self.repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Session", "id", session_id))
    }

    pub async fn live_cost(&self, session_id: &str) -> DomainResult<CostBreakdown> {
        let session = self.get_session(session_id).await?;
        let segments = self.repos.sessions().segments(session_id).await?;
        Ok(self.cost_of(&session, &segments))
    }

    pub async fn session_details(&self, session_id: &str) -> DomainResult<SessionDetails> {
        let session = self.get_session(session_id).await?;
        let sessions = self.repos.sessions();
        let segments = sessions.segments(session_id).await?;
        let charges = sessions.charges(session_id).await?;
        let transfers = sessions.transfers(session_id).await?;
        let cost = self.cost_of(&session, &segments);

        Ok(SessionDetails {
            session,
            segments,
            charges,
            transfers,
            cost,
        })
    }

    pub async fn active_sessions(&self) -> DomainResult<Vec<LiveSession>> {
        let sessions = self.repos.sessions().find_live().await?;
        let mut live = Vec::with_capacity(sessions.len());
        for session in sessions {
            let segments = self.repos.sessions().segments(&session.id).await?;
            let cost = self.cost_of(&session, &segments);
            live.push(LiveSession { session, cost });
        }
        Ok(live)
    }

    /// Ended sessions are costed at their end instant
    fn cost_of(&self, session: &Session, segments: &[Segment]) -> CostBreakdown {
        let at = session.ended_at().unwrap_or_else(|| self.clock.now());
        compute_cost(session, segments, at)
    }

    // ── Evaluation ─────────────────────────────────────────────

    /// Check timer and cost-limit thresholds of one session. Flags are
    /// committed before anything is announced, so a second evaluation with
    /// nothing new returns no notifications.
    pub async fn evaluate_session(&self, session_id: &str) -> DomainResult<Vec<Notification>> {
        let (_guard, mut session) = self.lock_session(session_id).await?;
        if !session.is_live() {
            return Ok(Vec::new());
        }

        let segments = self.repos.sessions().segments(session_id).await?;
        let now = self.clock.now();
        let cost = compute_cost(&session, &segments, now);
        let elapsed = cost.elapsed_minutes;
        let mut fired = Vec::new();

        if let Some(timer) = session.timer_minutes {
            let remaining = i64::from(timer) - elapsed;
            if !session.timer_notified && remaining <= 0 {
                session.timer_notified = true;
                session.timer_warning_notified = true;
                fired.push(Notification::TimerExpired(TimerExpiredEvent {
                    session_id: session.id.clone(),
                    station_id: session.station_id.clone(),
                    timer_minutes: timer,
                    elapsed_minutes: elapsed,
                    timestamp: now,
                }));
            } else if !session.timer_notified
                && !session.timer_warning_notified
                && remaining <= i64::from(self.timer_warning_minutes)
            {
                session.timer_warning_notified = true;
                fired.push(Notification::TimerWarning(TimerWarningEvent {
                    session_id: session.id.clone(),
                    station_id: session.station_id.clone(),
                    minutes_remaining: remaining,
                    timer_minutes: timer,
                    timestamp: now,
                }));
            }
        }

        if let Some(limit) = session.cost_limit {
            if !session.cost_limit_notified && cost.gaming_cost >= limit {
                session.cost_limit_notified = true;
                fired.push(Notification::CostLimitReached(CostLimitReachedEvent {
                    session_id: session.id.clone(),
                    station_id: session.station_id.clone(),
                    cost_limit: limit,
                    gaming_cost: cost.gaming_cost,
                    timestamp: now,
                }));
            }
        }

        if fired.is_empty() {
            return Ok(fired);
        }

        self.repos
            .sessions()
            .commit(SessionChangeSet::new().session(session.clone()))
            .await?;

        for notification in &fired {
            info!(
                session_id,
                station_id = %session.station_id,
                event_type = notification.event_type(),
                elapsed_minutes = elapsed,
                gaming_cost = cost.gaming_cost,
                "⏰ Threshold reached"
            );
            self.notifier.notify(notification.clone());
        }
        Ok(fired)
    }

    /// Evaluate every live session. Per-session failures are logged and
    /// skipped; returns how many notifications were raised.
    pub async fn evaluate_all(&self) -> DomainResult<usize> {
        let live = self.repos.sessions().find_live().await?;
        let mut raised = 0;
        for session in live {
            match self.evaluate_session(&session.id).await {
                Ok(fired) => raised += fired.len(),
                Err(e) => warn!(session_id = %session.id, error = %e, "Session evaluation failed"),
            }
        }
        Ok(raised)
    }

    // ── Stations ───────────────────────────────────────────────

    /// Every station with the id of its live session, if any
    pub async fn station_overview(&self) -> DomainResult<Vec<StationOverview>> {
        let stations = self.repos.stations().find_all().await?;
        let live = self.repos.sessions().find_live().await?;
        Ok(stations
            .into_iter()
            .map(|station| {
                let live_session_id = live
                    .iter()
                    .find(|s| s.station_id == station.id)
                    .map(|s| s.id.clone());
                StationOverview {
                    station,
                    live_session_id,
                }
            })
            .collect())
    }

    /// Take a station out of service or bring it back. Leaving maintenance
    /// restores `occupied` when a session is still live on the station.
    pub async fn set_maintenance(&self, station_id: &str, maintenance: bool) -> DomainResult<Station> {
        let _guard = self.locks.lock(station_id).await;

        let mut station = self.load_station(station_id).await?;
        let live = self
            .repos
            .sessions()
            .find_live_for_station(station_id)
            .await?;
        let status = match (maintenance, live) {
            (true, Some(session)) => {
                return Err(DomainError::Conflict(format!(
                    "station {station_id} has live session {}",
                    session.id
                )))
            }
            (true, None) => StationStatus::Maintenance,
            (false, Some(_)) => StationStatus::Occupied,
            (false, None) => StationStatus::Available,
        };

        self.repos
            .stations()
            .update_status(station_id, status)
            .await?;
        info!(station_id, status = %status, "🛠️ Station status changed");

        station.status = status;
        Ok(station)
    }

    // ── Internals ──────────────────────────────────────────────

    async fn load_station(&self, station_id: &str) -> DomainResult<Station> {
        self.repos
            .stations()
            .find_by_id(station_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Station", "id", station_id))
    }

    async fn lock_session(&self, session_id: &str) -> DomainResult<(OwnedMutexGuard<()>, Session)> {
        let (mut guards, session) = self.lock_session_with(session_id, None).await?;
        // One station requested, so exactly one guard.
        match guards.pop() {
            Some(guard) => Ok((guard, session)),
            None => Err(DomainError::Conflict(format!(
                "could not lock station of session {session_id}"
            ))),
        }
    }

    /// Lock the session's station (plus `extra`), then confirm the session
    /// did not move to another station while waiting.
    async fn lock_session_with(
        &self,
        session_id: &str,
        extra: Option<&str>,
    ) -> DomainResult<(Vec<OwnedMutexGuard<()>>, Session)> {
        let mut station_id = self.get_session(session_id).await?.station_id;
        for _ in 0..MAX_LOCK_ATTEMPTS {
            let guards = {
                let mut keys = vec![station_id.as_str()];
                keys.extend(extra);
                self.locks.lock_many(&keys).await
            };

            let session = self.get_session(session_id).await?;
            if session.station_id == station_id {
                return Ok((guards, session));
            }
            drop(guards);
            station_id = session.station_id;
        }
        Err(DomainError::Conflict(format!(
            "session {session_id} kept moving between stations"
        )))
    }

    async fn lock_session_pair(
        &self,
        first_id: &str,
        second_id: &str,
    ) -> DomainResult<(Vec<OwnedMutexGuard<()>>, Session, Session)> {
        let mut stations = (
            self.get_session(first_id).await?.station_id,
            self.get_session(second_id).await?.station_id,
        );
        for _ in 0..MAX_LOCK_ATTEMPTS {
            let guards = self
                .locks
                .lock_many(&[stations.0.as_str(), stations.1.as_str()])
                .await;

            let first = self.get_session(first_id).await?;
            let second = self.get_session(second_id).await?;
            if first.station_id == stations.0 && second.station_id == stations.1 {
                return Ok((guards, first, second));
            }
            drop(guards);
            stations = (first.station_id, second.station_id);
        }
        Err(DomainError::Conflict(format!(
            "sessions {first_id} and {second_id} kept moving between stations"
        )))
    }

    /// Best-effort: the session write already succeeded, so a failure here
    /// only leaves the station badge stale.
    async fn set_station_status(&self, station_id: &str, status: StationStatus) {
        let stations = self.repos.stations();
        let result = match stations.find_by_id(station_id).await {
            Ok(Some(station)) if station.is_under_maintenance() => return,
            Ok(Some(_)) => stations.update_status(station_id, status).await,
            Ok(None) => return,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(station_id, status = %status, error = %e, "Failed to update station status");
        }
    }

    async fn after_end(&self, session: &Session, cost: &CostBreakdown, now: DateTime<Utc>) {
        let total_cost = session.total_cost().unwrap_or(cost.gaming_cost);
        info!(
            session_id = %session.id,
            station_id = %session.station_id,
            total_cost,
            orders_cost = session.orders_cost,
            transferred_cost = session.transferred_cost,
            elapsed_minutes = cost.elapsed_minutes,
            "🏁 Session ended"
        );
        metrics::counter!(SESSIONS_ENDED_TOTAL, "started_by" => session.started_by.as_str())
            .increment(1);

        self.set_station_status(&session.station_id, StationStatus::Available)
            .await;
        self.notifier
            .notify(Notification::SessionEnded(SessionEndedEvent {
                session_id: session.id.clone(),
                station_id: session.station_id.clone(),
                total_cost,
                orders_cost: session.orders_cost,
                transferred_cost: session.transferred_cost,
                elapsed_minutes: cost.elapsed_minutes,
                timestamp: now,
            }));
    }
}

/// The open segment, if any (cloned for modification)
fn open_segment(segments: &[Segment]) -> Option<Segment> {
    segments.iter().rev().find(|s| s.is_open()).cloned()
}

/// Move the session to `Ended` and close its open segment, attributing a
/// running pause to that segment. Returns the segment to persist.
fn close_out(
    session: &mut Session,
    segments: &[Segment],
    now: DateTime<Utc>,
    total_cost: Piasters,
) -> DomainResult<Option<Segment>> {
    let folded = session.finish(now, total_cost)?;
    Ok(open_segment(segments).map(|mut open| {
        open.paused_ms += folded;
        open.close(now);
        open
    }))
}

/// One week; timers are stored as a 32-bit column
pub const MAX_TIMER_MINUTES: u32 = 7 * 24 * 60;

fn validate_timer(minutes: Option<u32>) -> DomainResult<()> {
    match minutes {
        Some(0) => Err(DomainError::Validation("timer must be at least one minute".into())),
        Some(m) if m > MAX_TIMER_MINUTES => Err(DomainError::Validation(format!(
            "timer cannot exceed {MAX_TIMER_MINUTES} minutes"
        ))),
        _ => Ok(()),
    }
}

fn validate_cost_limit(limit: Option<Piasters>) -> DomainResult<()> {
    if matches!(limit, Some(l) if l < 0) {
        return Err(DomainError::Validation("cost limit cannot be negative".into()));
    }
    Ok(())
}

fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

// ── Tests ──────────────────────────────────────────────────────
