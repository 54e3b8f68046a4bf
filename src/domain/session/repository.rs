//! Session store interface

use async_trait::async_trait;

use super::model::{Charge, Segment, Session, Transfer};
use crate::domain::DomainResult;

/// Everything one engine operation writes. Implementations must apply a
/// change set atomically: either every record lands or none does.
#[derive(Debug, Clone, Default)]
pub struct SessionChangeSet {
    /// Inserted or replaced by id
    pub sessions: Vec<Session>,
    /// Inserted or replaced by id
    pub segments: Vec<Segment>,
    pub new_charges: Vec<Charge>,
    pub removed_charges: Vec<String>,
    pub transfers: Vec<Transfer>,
}

impl SessionChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(mut self, session: Session) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn add_charge(mut self, charge: Charge) -> Self {
        self.new_charges.push(charge);
        self
    }

    pub fn remove_charge(mut self, charge_id: impl Into<String>) -> Self {
        self.removed_charges.push(charge_id.into());
        self
    }

    pub fn transfer(mut self, transfer: Transfer) -> Self {
        self.transfers.push(transfer);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
            && self.segments.is_empty()
            && self.new_charges.is_empty()
            && self.removed_charges.is_empty()
            && self.transfers.is_empty()
    }
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Session>>;
    /// The non-ended session on a station, if any
    async fn find_live_for_station(&self, station_id: &str) -> DomainResult<Option<Session>>;
    async fn find_live(&self) -> DomainResult<Vec<Session>>;
    /// Ordered by `seq`
    async fn segments(&self, session_id: &str) -> DomainResult<Vec<Segment>>;
    async fn charges(&self, session_id: &str) -> DomainResult<Vec<Charge>>;
    /// Transfers where the session is either source or target
    async fn transfers(&self, session_id: &str) -> DomainResult<Vec<Transfer>>;
    async fn commit(&self, changes: SessionChangeSet) -> DomainResult<()>;
}
