//! Create session_segments table

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
                    .table(SessionSegments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionSegments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionSegments::SessionId).string().not_null())
                    .col(ColumnDef::new(SessionSegments::Seq).integer().not_null())
                    .col(ColumnDef::new(SessionSegments::Mode).string().not_null())
                    .col(
                        ColumnDef::new(SessionSegments::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SessionSegments::EndedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(SessionSegments::HourlyRateSnapshot)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionSegments::PausedMs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_segments_session")
                            .from(SessionSegments::Table, SessionSegments::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_segments_session_seq")
                    .table(SessionSegments::Table)
                    .col(SessionSegments::SessionId)
                    .col(SessionSegments::Seq)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionSegments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum SessionSegments {
    Table,
    Id,
    SessionId,
    Seq,
    Mode,
    StartedAt,
    EndedAt,
    HourlyRateSnapshot,
    PausedMs,
}
