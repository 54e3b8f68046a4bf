//! Create sessions table
//!
//! One row per gaming session. At most one row per station may have a
//! status other than `ended`; the engine enforces this under the station lock.

use sea_orm_migration::prelude::*;

use super::m20240501_000001_create_stations::Stations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::StationId).string().not_null())
                    .col(
                        ColumnDef::new(Sessions::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Sessions::PausedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Sessions::EndedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Sessions::TotalCost).big_integer())
                    .col(
                        ColumnDef::new(Sessions::HourlyRateSnapshot)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::OrdersCost)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Sessions::ExtraCharges)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Sessions::TransferredCost)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Sessions::CurrentMode)
                            .string()
                            .not_null()
                            .default("single"),
                    )
                    .col(
                        ColumnDef::new(Sessions::StartedBy)
                            .string()
                            .not_null()
                            .default("manual"),
                    )
                    .col(ColumnDef::new(Sessions::TimerMinutes).integer())
                    .col(
                        ColumnDef::new(Sessions::TimerWarningNotified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Sessions::TimerNotified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Sessions::CostLimit).big_integer())
                    .col(
                        ColumnDef::new(Sessions::CostLimitNotified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Sessions::TotalPausedMs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Sessions::Notes).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_station")
                            .from(Sessions::Table, Sessions::StationId)
                            .to(Stations::Table, Stations::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_station_status")
                    .table(Sessions::Table)
                    .col(Sessions::StationId)
                    .col(Sessions::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Sessions {
    Table,
    Id,
    StationId,
    StartedAt,
    Status,
    PausedAt,
    EndedAt,
    TotalCost,
    HourlyRateSnapshot,
    OrdersCost,
    ExtraCharges,
    TransferredCost,
    CurrentMode,
    StartedBy,
    TimerMinutes,
    TimerWarningNotified,
    TimerNotified,
    CostLimit,
    CostLimitNotified,
    TotalPausedMs,
    Notes,
}
