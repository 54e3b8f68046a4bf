//! Create session_transfers table
//!
//! Append-only record of balances carried from one session to another.

use sea_orm_migration::prelude::*;

use super::m20240501_000002_create_sessions::Sessions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SessionTransfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionTransfers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SessionTransfers::FromSessionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionTransfers::ToSessionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionTransfers::FromStationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionTransfers::GamingAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionTransfers::OrdersAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionTransfers::TotalAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionTransfers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transfers_from_session")
                            .from(SessionTransfers::Table, SessionTransfers::FromSessionId)
                            .to(Sessions::Table, Sessions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transfers_to_session")
                            .from(SessionTransfers::Table, SessionTransfers::ToSessionId)
                            .to(Sessions::Table, Sessions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transfers_from_session")
                    .table(SessionTransfers::Table)
                    .col(SessionTransfers::FromSessionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transfers_to_session")
                    .table(SessionTransfers::Table)
                    .col(SessionTransfers::ToSessionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionTransfers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum SessionTransfers {
    Table,
    Id,
    FromSessionId,
    ToSessionId,
    FromStationId,
    GamingAmount,
    OrdersAmount,
    TotalAmount,
    CreatedAt,
}
