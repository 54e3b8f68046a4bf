//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20240501_000001_create_stations;
mod m20240501_000002_create_sessions;
mod m20240501_000003_create_session_segments;
mod m20240501_000004_create_session_charges;
mod m20240501_000005_create_session_transfers;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240501_000001_create_stations::Migration),
            Box::new(m20240501_000002_create_sessions::Migration),
            Box::new(m20240501_000003_create_session_segments::Migration),
            Box::new(m20240501_000004_create_session_charges::Migration),
            Box::new(m20240501_000005_create_session_transfers::Migration),
        ]
    }
}
