//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::repositories::RepositoryProvider;
use crate::domain::{SessionRepository, StationRepository};

use super::session_repository::SeaOrmSessionRepository;
use super::station_repository::SeaOrmStationRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let station = repos.stations().find_by_mac("aa:bb:cc:dd:ee:01").await?;
/// let live = repos.sessions().find_live().await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    stations: SeaOrmStationRepository,
    sessions: SeaOrmSessionRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            stations: SeaOrmStationRepository::new(db.clone()),
            sessions: SeaOrmSessionRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn stations(&self) -> &dyn StationRepository {
        &self.stations
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Charge, GameMode, Segment, Session, SessionChangeSet, StartedBy, Station, StationStatus,
        Transfer,
    };
    use crate::infrastructure::database::{init_database, run_migrations, DatabaseConfig};
    use chrono::{Duration, TimeZone, Utc};

    async fn provider() -> SeaOrmRepositoryProvider {
        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&db).await.unwrap();
        let repos = SeaOrmRepositoryProvider::new(db);
        for (id, mac) in [("ps-1", "aa:bb:cc:dd:ee:01"), ("ps-2", "aa:bb:cc:dd:ee:02")] {
            repos
                .stations()
                .upsert(Station {
                    id: id.into(),
                    name: id.to_uppercase(),
                    mac_address: mac.into(),
                    hourly_rate_single: 2000,
                    hourly_rate_multi: Some(3500),
                    status: StationStatus::Available,
                })
                .await
                .unwrap();
        }
        repos
    }

    #[tokio::test]
    async fn stations_roundtrip_and_status_update() {
        let repos = provider().await;

        let by_mac = repos
            .stations()
            .find_by_mac("aa:bb:cc:dd:ee:02")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_mac.id, "ps-2");
        assert_eq!(by_mac.hourly_rate_multi, Some(3500));

        repos
            .stations()
            .update_status("ps-2", StationStatus::Maintenance)
            .await
            .unwrap();
        let updated = repos.stations().find_by_id("ps-2").await.unwrap().unwrap();
        assert!(updated.is_under_maintenance());

        let missing = repos
            .stations()
            .update_status("ps-9", StationStatus::Occupied)
            .await;
        assert!(missing.is_err());
        assert_eq!(repos.stations().find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn commit_persists_full_session_graph() {
        let repos = provider().await;
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
        let station = repos.stations().find_by_id("ps-1").await.unwrap().unwrap();
        let other = repos.stations().find_by_id("ps-2").await.unwrap().unwrap();

        let mut session = Session::new(&station, StartedBy::Auto, t0);
        session.set_timer(Some(45));
        let target = Session::new(&other, StartedBy::Manual, t0);
        let mut first = Segment::open(&session.id, GameMode::Single, 2000, t0);
        first.close(t0 + Duration::minutes(10));
        let second = first.successor(GameMode::Multi, 3500, t0 + Duration::minutes(10));
        let charge = Charge::new(&session.id, -300, Some("promo".into()), t0);

        repos
            .sessions()
            .commit(
                SessionChangeSet::new()
                    .session(session.clone())
                    .session(target.clone())
                    .segment(first.clone())
                    .segment(second.clone())
                    .add_charge(charge.clone()),
            )
            .await
            .unwrap();

        let loaded = repos.sessions().find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(
            repos.sessions().segments(&session.id).await.unwrap(),
            vec![first, second]
        );
        assert_eq!(repos.sessions().charges(&session.id).await.unwrap(), vec![charge.clone()]);

        // End with a transfer and drop the charge in one change set
        let ended_at = t0 + Duration::minutes(30);
        session.pause(t0 + Duration::minutes(20)).unwrap();
        session.finish(ended_at, 1500).unwrap();
        session.transferred_cost = 1500;
        let transfer = Transfer {
            id: "tr-1".into(),
            from_session_id: session.id.clone(),
            to_session_id: target.id.clone(),
            from_station_id: "ps-1".into(),
            gaming_amount: 1500,
            orders_amount: 0,
            total_amount: 1500,
            created_at: ended_at,
        };
        repos
            .sessions()
            .commit(
                SessionChangeSet::new()
                    .session(session.clone())
                    .remove_charge(&charge.id)
                    .transfer(transfer.clone()),
            )
            .await
            .unwrap();

        let ended = repos.sessions().find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(ended.total_cost(), Some(1500));
        assert_eq!(ended.total_paused_ms, 10 * 60_000);
        assert!(repos.sessions().charges(&session.id).await.unwrap().is_empty());
        assert_eq!(repos.sessions().transfers(&target.id).await.unwrap(), vec![transfer]);

        let live = repos.sessions().find_live().await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, target.id);
        assert!(repos
            .sessions()
            .find_live_for_station("ps-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn failed_commit_writes_nothing() {
        let repos = provider().await;
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
        let station = repos.stations().find_by_id("ps-1").await.unwrap().unwrap();
        let session = Session::new(&station, StartedBy::Manual, t0);
        let segment = Segment::open(&session.id, GameMode::Single, 2000, t0);

        // Two segments with the same (session, seq) violate the unique index
        let mut duplicate = Segment::open(&session.id, GameMode::Multi, 3500, t0);
        duplicate.seq = segment.seq;

        let result = repos
            .sessions()
            .commit(
                SessionChangeSet::new()
                    .session(session.clone())
                    .segment(segment)
                    .segment(duplicate),
            )
            .await;

        assert!(result.unwrap_err().is_transient());
        assert!(repos.sessions().find_by_id(&session.id).await.unwrap().is_none());
    }
}
