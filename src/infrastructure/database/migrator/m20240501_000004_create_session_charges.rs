//! Create session_charges table

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
                    .table(SessionCharges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionCharges::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionCharges::SessionId).string().not_null())
                    .col(ColumnDef::new(SessionCharges::Amount).big_integer().not_null())
                    .col(ColumnDef::new(SessionCharges::Reason).string())
                    .col(
                        ColumnDef::new(SessionCharges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charges_session")
                            .from(SessionCharges::Table, SessionCharges::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charges_session")
                    .table(SessionCharges::Table)
                    .col(SessionCharges::SessionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionCharges::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum SessionCharges {
    Table,
    Id,
    SessionId,
    Amount,
    Reason,
    CreatedAt,
}
