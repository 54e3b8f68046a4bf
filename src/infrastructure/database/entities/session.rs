//! Gaming session entity
//!
//! The lifecycle state is flattened into `status` plus the nullable
//! `paused_at` / `ended_at` / `total_cost` columns.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub station_id: String,

    pub started_at: DateTimeUtc,

    /// active | paused | ended
    pub status: String,

    #[sea_orm(nullable)]
    pub paused_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub ended_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub total_cost: Option<i64>,

    pub hourly_rate_snapshot: i64,
    pub orders_cost: i64,
    pub extra_charges: i64,
    pub transferred_cost: i64,

    /// single | multi
    pub current_mode: String,

    /// manual | auto
    pub started_by: String,

    #[sea_orm(nullable)]
    pub timer_minutes: Option<i32>,
    pub timer_warning_notified: bool,
    pub timer_notified: bool,

    #[sea_orm(nullable)]
    pub cost_limit: Option<i64>,
    pub cost_limit_notified: bool,

    pub total_paused_ms: i64,

    #[sea_orm(nullable)]
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::station::Entity",
        from = "Column::StationId",
        to = "super::station::Column::Id"
    )]
    Station,
    #[sea_orm(has_many = "super::segment::Entity")]
    Segments,
    #[sea_orm(has_many = "super::charge::Entity")]
    Charges,
}

impl Related<super::station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Station.def()
    }
}

impl Related<super::segment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Segments.def()
    }
}

impl Related<super::charge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Charges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
