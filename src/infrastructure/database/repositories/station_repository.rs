//! SeaORM implementation of StationRepository

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::{DomainError, DomainResult, Station, StationRepository, StationStatus};
use crate::infrastructure::database::entities::station;

pub struct SeaOrmStationRepository {
    db: DatabaseConnection,
}

impl SeaOrmStationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: station::Model) -> DomainResult<Station> {
    let status = StationStatus::from_str(&m.status).ok_or_else(|| {
        DomainError::Storage(format!("station {} has unknown status '{}'", m.id, m.status))
    })?;
    Ok(Station {
        id: m.id,
        name: m.name,
        mac_address: m.mac_address,
        hourly_rate_single: m.hourly_rate_single,
        hourly_rate_multi: m.hourly_rate_multi,
        status,
    })
}

fn domain_to_active(s: Station) -> station::ActiveModel {
    station::ActiveModel {
        id: Set(s.id),
        name: Set(s.name),
        mac_address: Set(s.mac_address),
        hourly_rate_single: Set(s.hourly_rate_single),
        hourly_rate_multi: Set(s.hourly_rate_multi),
        status: Set(s.status.as_str().to_string()),
        updated_at: Set(Utc::now()),
    }
}

// ── StationRepository impl ──────────────────────────────────────

#[async_trait]
impl StationRepository for SeaOrmStationRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Station>> {
        station::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_mac(&self, mac: &str) -> DomainResult<Option<Station>> {
        station::Entity::find()
            .filter(station::Column::MacAddress.eq(mac))
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_all(&self) -> DomainResult<Vec<Station>> {
        station::Entity::find()
            .order_by_asc(station::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn upsert(&self, s: Station) -> DomainResult<()> {
        debug!("Upserting station: {} ({})", s.id, s.mac_address);

        let exists = station::Entity::find_by_id(s.id.clone())
            .one(&self.db)
            .await?
            .is_some();

        let model = domain_to_active(s);
        if exists {
            model.update(&self.db).await?;
        } else {
            model.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn update_status(&self, id: &str, status: StationStatus) -> DomainResult<()> {
        debug!("Updating station {} status to {}", id, status);

        let existing = station::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Station", "id", id))?;

        let mut model: station::ActiveModel = existing.into();
        model.status = Set(status.as_str().to_string());
        model.updated_at = Set(Utc::now());
        model.update(&self.db).await?;
        Ok(())
    }
}
