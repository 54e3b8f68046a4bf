//! Connectivity monitor
//!
//! Routers report `connect` / `disconnect` per console MAC. Signals are
//! edge-triggered: only a change of the tracked link state has an effect,
//! so duplicate webhook deliveries are harmless.
//!
//! - up, station idle → auto-start a session
//! - down, auto-started session live → end it
//! - manual sessions are never ended by a disconnect

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::billing::{BillingEngine, StartOptions};
use crate::domain::{
    normalize_mac, DomainError, DomainResult, Piasters, RepositoryProvider, StartedBy, Station,
};

pub const CONNECTIVITY_SIGNALS_TOTAL: &str = "connectivity_signals_total";

/// Last known link state of a MAC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Up,
    Down,
    Unknown,
}

/// Normalized webhook action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    Connect,
    Disconnect,
}

impl LinkAction {
    /// Accepts `connect`/`up` and `disconnect`/`down`, case-insensitive
    pub fn parse(raw: &str) -> DomainResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "connect" | "up" => Ok(Self::Connect),
            "disconnect" | "down" => Ok(Self::Disconnect),
            other => Err(DomainError::Validation(format!(
                "unknown connectivity action '{other}'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
        }
    }

    fn target_state(&self) -> LinkState {
        match self {
            Self::Connect => LinkState::Up,
            Self::Disconnect => LinkState::Down,
        }
    }
}

/// What a signal did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityOutcome {
    Started {
        session_id: String,
        station_id: String,
    },
    Ended {
        session_id: String,
        station_id: String,
        total_cost: Piasters,
    },
    /// Accepted without effect
    Ignored { reason: String },
}

impl ConnectivityOutcome {
    fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }

    pub fn action(&self) -> Option<&'static str> {
        match self {
            Self::Started { .. } => Some("started"),
            Self::Ended { .. } => Some("ended"),
            Self::Ignored { .. } => None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Started { session_id, .. } | Self::Ended { session_id, .. } => Some(session_id),
            Self::Ignored { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Started { station_id, .. } => format!("Session started on {station_id}"),
            Self::Ended {
                station_id,
                total_cost,
                ..
            } => format!("Session ended on {station_id} (total {total_cost})"),
            Self::Ignored { reason } => reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LinkEntry {
    state: LinkState,
    changed_at: DateTime<Utc>,
}

/// Snapshot row for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedLink {
    pub mac: String,
    pub state: LinkState,
    pub changed_at: DateTime<Utc>,
}

pub struct ConnectivityMonitor {
    repos: Arc<dyn RepositoryProvider>,
    engine: Arc<BillingEngine>,
    links: DashMap<String, LinkEntry>,
}

impl ConnectivityMonitor {
    pub fn new(repos: Arc<dyn RepositoryProvider>, engine: Arc<BillingEngine>) -> Self {
        Self {
            repos,
            engine,
            links: DashMap::new(),
        }
    }

    pub fn state_of(&self, mac: &str) -> LinkState {
        normalize_mac(mac)
            .and_then(|mac| self.links.get(&mac).map(|e| e.state))
            .unwrap_or(LinkState::Unknown)
    }

    /// Tracked links ordered by MAC
    pub fn states(&self) -> Vec<TrackedLink> {
        let mut links: Vec<TrackedLink> = self
            .links
            .iter()
            .map(|e| TrackedLink {
                mac: e.key().clone(),
                state: e.state,
                changed_at: e.changed_at,
            })
            .collect();
        links.sort_by(|a, b| a.mac.cmp(&b.mac));
        links
    }

    pub async fn handle_signal(&self, mac: &str, action: &str) -> DomainResult<ConnectivityOutcome> {
        let action = LinkAction::parse(action)?;
        let mac = normalize_mac(mac)
            .ok_or_else(|| DomainError::Validation("mac address is required".into()))?;

        metrics::counter!(CONNECTIVITY_SIGNALS_TOTAL, "action" => action.as_str()).increment(1);

        let station = self
            .repos
            .stations()
            .find_by_mac(&mac)
            .await?
            .ok_or_else(|| DomainError::not_found("Station", "mac_address", mac.clone()))?;

        if station.is_under_maintenance() {
            debug!(mac = %mac, station_id = %station.id, "Signal ignored: station under maintenance");
            return Ok(ConnectivityOutcome::ignored(format!(
                "station {} is under maintenance",
                station.id
            )));
        }

        let new_state = action.target_state();
        let entry = LinkEntry {
            state: new_state,
            changed_at: self.engine.now(),
        };
        let previous = match self.links.entry(mac.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().state == new_state {
                    debug!(mac = %mac, action = action.as_str(), "Duplicate signal ignored");
                    return Ok(ConnectivityOutcome::ignored(format!(
                        "{} already {}",
                        station.id,
                        action.as_str()
                    )));
                }
                Some(occupied.insert(entry))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                None
            }
        };

        info!(
            mac = %mac,
            station_id = %station.id,
            action = action.as_str(),
            "📶 Link state changed"
        );

        let result = match action {
            LinkAction::Connect => self.on_connect(&station).await,
            LinkAction::Disconnect => self.on_disconnect(&station).await,
        };

        if let Err(e) = &result {
            warn!(mac = %mac, station_id = %station.id, error = %e, "Connectivity side effect failed, rolling back link state");
            self.roll_back(&mac, new_state, previous);
        }
        result
    }

    async fn on_connect(&self, station: &Station) -> DomainResult<ConnectivityOutcome> {
        if let Some(live) = self
            .repos
            .sessions()
            .find_live_for_station(&station.id)
            .await?
        {
            return Ok(ConnectivityOutcome::ignored(format!(
                "session {} already running on {}",
                live.id, station.id
            )));
        }

        match self
            .engine
            .start_session(&station.id, StartedBy::Auto, StartOptions::default())
            .await
        {
            Ok(session) => Ok(ConnectivityOutcome::Started {
                session_id: session.id,
                station_id: station.id.clone(),
            }),
            // Raced with a manual start
            Err(DomainError::Conflict(reason)) => Ok(ConnectivityOutcome::ignored(reason)),
            Err(e) => Err(e),
        }
    }

    async fn on_disconnect(&self, station: &Station) -> DomainResult<ConnectivityOutcome> {
        let Some(live) = self
            .repos
            .sessions()
            .find_live_for_station(&station.id)
            .await?
        else {
            return Ok(ConnectivityOutcome::ignored(format!(
                "no live session on {}",
                station.id
            )));
        };

        if live.started_by != StartedBy::Auto {
            return Ok(ConnectivityOutcome::ignored(format!(
                "manual session {} left running",
                live.id
            )));
        }

        match self.engine.end_session(&live.id, None).await {
            Ok(ended) => Ok(ConnectivityOutcome::Ended {
                session_id: ended.session.id,
                station_id: station.id.clone(),
                total_cost: ended.total_cost,
            }),
            // Ended concurrently by staff
            Err(DomainError::InvalidState(reason)) => Ok(ConnectivityOutcome::ignored(reason)),
            Err(e) => Err(e),
        }
    }

    /// Restore the previous entry unless another signal replaced ours meanwhile.
    fn roll_back(&self, mac: &str, ours: LinkState, previous: Option<LinkEntry>) {
        match previous {
            Some(previous) => {
                if let Some(mut current) = self.links.get_mut(mac) {
                    if current.state == ours {
                        *current = previous;
                    }
                }
            }
            None => {
                self.links.remove_if(mac, |_, current| current.state == ours);
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::notifications::Notifier;
    use crate::domain::{
        Charge, Segment, Session, SessionChangeSet, SessionRepository, StationRepository,
        StationStatus, Transfer,
    };
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use crate::shared::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};

    const MAC: &str = "AA-BB-CC-DD-EE-01";

    /// Provider whose session store can be made to fail while stations keep working
    struct FlakyProvider {
        inner: Arc<InMemoryRepositoryProvider>,
        failing: FailingSessions,
    }

    struct FailingSessions {
        inner: Arc<InMemoryRepositoryProvider>,
        fail: AtomicBool,
    }

    impl FailingSessions {
        fn check(&self) -> DomainResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(DomainError::Storage("disk full".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SessionRepository for FailingSessions {
        async fn find_by_id(&self, id: &str) -> DomainResult<Option<Session>> {
            self.inner.sessions().find_by_id(id).await
        }
        async fn find_live_for_station(&self, station_id: &str) -> DomainResult<Option<Session>> {
            self.inner.sessions().find_live_for_station(station_id).await
        }
        async fn find_live(&self) -> DomainResult<Vec<Session>> {
            self.inner.sessions().find_live().await
        }
        async fn segments(&self, session_id: &str) -> DomainResult<Vec<Segment>> {
            self.inner.sessions().segments(session_id).await
        }
        async fn charges(&self, session_id: &str) -> DomainResult<Vec<Charge>> {
            self.inner.sessions().charges(session_id).await
        }
        async fn transfers(&self, session_id: &str) -> DomainResult<Vec<Transfer>> {
            self.inner.sessions().transfers(session_id).await
        }
        async fn commit(&self, changes: SessionChangeSet) -> DomainResult<()> {
            self.check()?;
            self.inner.sessions().commit(changes).await
        }
    }

    impl RepositoryProvider for FlakyProvider {
        fn stations(&self) -> &dyn StationRepository {
            self.inner.stations()
        }
        fn sessions(&self) -> &dyn SessionRepository {
            &self.failing
        }
    }

    struct Harness {
        monitor: ConnectivityMonitor,
        engine: Arc<BillingEngine>,
        repos: Arc<FlakyProvider>,
    }

    async fn harness() -> Harness {
        let store = Arc::new(InMemoryRepositoryProvider::new());
        let repos = Arc::new(FlakyProvider {
            inner: store.clone(),
            failing: FailingSessions {
                inner: store,
                fail: AtomicBool::new(false),
            },
        });
        for (id, mac, status) in [
            ("ps-1", "aa:bb:cc:dd:ee:01", StationStatus::Available),
            ("ps-2", "aa:bb:cc:dd:ee:02", StationStatus::Maintenance),
        ] {
            repos
                .stations()
                .upsert(Station {
                    id: id.into(),
                    name: id.to_uppercase(),
                    mac_address: mac.into(),
                    hourly_rate_single: 2000,
                    hourly_rate_multi: None,
                    status,
                })
                .await
                .unwrap();
        }
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap(),
        ));
        let engine = Arc::new(BillingEngine::new(repos.clone(), clock, Notifier::new()));
        Harness {
            monitor: ConnectivityMonitor::new(repos.clone(), engine.clone()),
            engine,
            repos,
        }
    }

    #[tokio::test]
    async fn duplicate_connect_starts_one_session() {
        let h = harness().await;

        let first = h.monitor.handle_signal(MAC, "connect").await.unwrap();
        assert_eq!(first.action(), Some("started"));

        let second = h.monitor.handle_signal(MAC, "up").await.unwrap();
        assert_eq!(second.action(), None);

        let live = h.engine.active_sessions().await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].session.started_by, StartedBy::Auto);
        assert_eq!(h.monitor.state_of("aa:bb:cc:dd:ee:01"), LinkState::Up);
    }

    #[tokio::test]
    async fn concurrent_duplicate_connects_start_one_session() {
        let h = Arc::new(harness().await);
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let h = h.clone();
            tasks.push(tokio::spawn(async move {
                h.monitor.handle_signal(MAC, "connect").await.unwrap()
            }));
        }
        let mut started = 0;
        for task in tasks {
            if task.await.unwrap().action() == Some("started") {
                started += 1;
            }
        }
        assert_eq!(started, 1);
        assert_eq!(h.engine.active_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disconnect_leaves_manual_session_running() {
        let h = harness().await;
        let manual = h
            .engine
            .start_session("ps-1", StartedBy::Manual, StartOptions::default())
            .await
            .unwrap();

        let connect = h.monitor.handle_signal(MAC, "connect").await.unwrap();
        assert_eq!(connect.action(), None);

        let disconnect = h.monitor.handle_signal(MAC, "disconnect").await.unwrap();
        assert_eq!(disconnect.action(), None);
        assert!(h.engine.get_session(&manual.id).await.unwrap().is_live());
    }

    #[tokio::test]
    async fn disconnect_ends_auto_session() {
        let h = harness().await;
        let started = h.monitor.handle_signal(MAC, "connect").await.unwrap();
        let session_id = started.session_id().unwrap().to_string();

        let ended = h.monitor.handle_signal(MAC, "DOWN").await.unwrap();
        assert_eq!(ended.action(), Some("ended"));
        assert_eq!(ended.session_id(), Some(session_id.as_str()));
        assert!(!h.engine.get_session(&session_id).await.unwrap().is_live());
    }

    #[tokio::test]
    async fn reconnect_after_disconnect_starts_new_session() {
        let h = harness().await;
        h.monitor.handle_signal(MAC, "connect").await.unwrap();
        h.monitor.handle_signal(MAC, "disconnect").await.unwrap();
        let again = h.monitor.handle_signal(MAC, "connect").await.unwrap();
        assert_eq!(again.action(), Some("started"));
    }

    #[tokio::test]
    async fn first_disconnect_is_recorded() {
        let h = harness().await;
        let outcome = h.monitor.handle_signal(MAC, "disconnect").await.unwrap();
        assert_eq!(outcome.action(), None);
        assert_eq!(h.monitor.states().len(), 1);
        assert_eq!(h.monitor.states()[0].state, LinkState::Down);
    }

    #[tokio::test]
    async fn maintenance_station_is_ignored_and_untracked() {
        let h = harness().await;
        let outcome = h
            .monitor
            .handle_signal("aa:bb:cc:dd:ee:02", "connect")
            .await
            .unwrap();
        assert_eq!(outcome.action(), None);
        assert_eq!(h.monitor.state_of("aa:bb:cc:dd:ee:02"), LinkState::Unknown);
        assert!(h.engine.active_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let h = harness().await;
        assert!(matches!(
            h.monitor.handle_signal(MAC, "reboot").await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            h.monitor.handle_signal("  ", "connect").await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            h.monitor.handle_signal("11:22:33:44:55:66", "connect").await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn failed_side_effect_rolls_back_so_redelivery_retries() {
        let h = harness().await;
        h.repos.failing.fail.store(true, Ordering::SeqCst);

        let failed = h.monitor.handle_signal(MAC, "connect").await;
        assert!(matches!(failed, Err(DomainError::Storage(_))));
        assert_eq!(h.monitor.state_of(MAC), LinkState::Unknown);

        h.repos.failing.fail.store(false, Ordering::SeqCst);
        let retried = h.monitor.handle_signal(MAC, "connect").await.unwrap();
        assert_eq!(retried.action(), Some("started"));
    }
}
