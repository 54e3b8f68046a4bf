//! Station registry interface

use async_trait::async_trait;

use super::model::{Station, StationStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait StationRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Station>>;
    /// `mac` must already be normalized (see [`super::normalize_mac`])
    async fn find_by_mac(&self, mac: &str) -> DomainResult<Option<Station>>;
    async fn find_all(&self) -> DomainResult<Vec<Station>>;
    /// Insert or replace; used when seeding stations from configuration
    async fn upsert(&self, station: Station) -> DomainResult<()>;
    async fn update_status(&self, id: &str, status: StationStatus) -> DomainResult<()>;
}
