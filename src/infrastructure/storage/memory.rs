//! In-memory repositories for development and testing
//!
//! Stations live in a `DashMap`; session tables sit behind one `RwLock` so a
//! [`SessionChangeSet`] is applied under a single write guard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::domain::{
    Charge, DomainError, DomainResult, RepositoryProvider, Segment, Session, SessionChangeSet,
    SessionRepository, Station, StationRepository, StationStatus, Transfer,
};

/// Simulated availability switch shared by both repositories
#[derive(Clone, Default)]
struct Availability(Arc<AtomicBool>);

impl Availability {
    fn check(&self) -> DomainResult<()> {
        if self.0.load(Ordering::SeqCst) {
            Err(DomainError::Storage("in-memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }
}

pub struct InMemoryStationRepository {
    stations: DashMap<String, Station>,
    outage: Availability,
}

#[async_trait]
impl StationRepository for InMemoryStationRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Station>> {
        self.outage.check()?;
        Ok(self.stations.get(id).map(|s| s.clone()))
    }

    async fn find_by_mac(&self, mac: &str) -> DomainResult<Option<Station>> {
        self.outage.check()?;
        Ok(self
            .stations
            .iter()
            .find(|s| s.mac_address == mac)
            .map(|s| s.clone()))
    }

    async fn find_all(&self) -> DomainResult<Vec<Station>> {
        self.outage.check()?;
        let mut all: Vec<Station> = self.stations.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn upsert(&self, station: Station) -> DomainResult<()> {
        self.outage.check()?;
        self.stations.insert(station.id.clone(), station);
        Ok(())
    }

    async fn update_status(&self, id: &str, status: StationStatus) -> DomainResult<()> {
        self.outage.check()?;
        match self.stations.get_mut(id) {
            Some(mut station) => {
                station.status = status;
                Ok(())
            }
            None => Err(DomainError::not_found("Station", "id", id)),
        }
    }
}

#[derive(Default)]
struct SessionTables {
    sessions: HashMap<String, Session>,
    segments: HashMap<String, Segment>,
    charges: HashMap<String, Charge>,
    transfers: HashMap<String, Transfer>,
}

pub struct InMemorySessionRepository {
    tables: RwLock<SessionTables>,
    outage: Availability,
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Session>> {
        self.outage.check()?;
        Ok(self.tables.read().await.sessions.get(id).cloned())
    }

    async fn find_live_for_station(&self, station_id: &str) -> DomainResult<Option<Session>> {
        self.outage.check()?;
        Ok(self
            .tables
            .read()
            .await
            .sessions
            .values()
            .find(|s| s.station_id == station_id && s.is_live())
            .cloned())
    }

    async fn find_live(&self) -> DomainResult<Vec<Session>> {
        self.outage.check()?;
        let mut live: Vec<Session> = self
            .tables
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.is_live())
            .cloned()
            .collect();
        live.sort_by_key(|s| s.started_at);
        Ok(live)
    }

    async fn segments(&self, session_id: &str) -> DomainResult<Vec<Segment>> {
        self.outage.check()?;
        let mut segments: Vec<Segment> = self
            .tables
            .read()
            .await
            .segments
            .values()
            .filter(|s| s.session_id == session_id)
            .cloned()
            .collect();
        segments.sort_by_key(|s| s.seq);
        Ok(segments)
    }

    async fn charges(&self, session_id: &str) -> DomainResult<Vec<Charge>> {
        self.outage.check()?;
        let mut charges: Vec<Charge> = self
            .tables
            .read()
            .await
            .charges
            .values()
            .filter(|c| c.session_id == session_id)
            .cloned()
            .collect();
        charges.sort_by_key(|c| c.created_at);
        Ok(charges)
    }

    async fn transfers(&self, session_id: &str) -> DomainResult<Vec<Transfer>> {
        self.outage.check()?;
        let mut transfers: Vec<Transfer> = self
            .tables
            .read()
            .await
            .transfers
            .values()
            .filter(|t| t.from_session_id == session_id || t.to_session_id == session_id)
            .cloned()
            .collect();
        transfers.sort_by_key(|t| t.created_at);
        Ok(transfers)
    }

    async fn commit(&self, changes: SessionChangeSet) -> DomainResult<()> {
        self.outage.check()?;
        let mut tables = self.tables.write().await;

        for session in changes.sessions {
            tables.sessions.insert(session.id.clone(), session);
        }
        for segment in changes.segments {
            tables.segments.insert(segment.id.clone(), segment);
        }
        for charge in changes.new_charges {
            tables.charges.insert(charge.id.clone(), charge);
        }
        for charge_id in changes.removed_charges {
            tables.charges.remove(&charge_id);
        }
        for transfer in changes.transfers {
            tables.transfers.insert(transfer.id.clone(), transfer);
        }
        Ok(())
    }
}

/// In-memory [`RepositoryProvider`]
pub struct InMemoryRepositoryProvider {
    stations: InMemoryStationRepository,
    sessions: InMemorySessionRepository,
    outage: Availability,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        let outage = Availability::default();
        Self {
            stations: InMemoryStationRepository {
                stations: DashMap::new(),
                outage: outage.clone(),
            },
            sessions: InMemorySessionRepository {
                tables: RwLock::new(SessionTables::default()),
                outage: outage.clone(),
            },
            outage,
        }
    }

    /// Make every subsequent call fail with `DomainError::Storage`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.outage.0.store(unavailable, Ordering::SeqCst);
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn stations(&self) -> &dyn StationRepository {
        &self.stations
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }
}
