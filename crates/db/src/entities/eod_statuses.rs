//! `SeaORM` Entity for eod_statuses table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "eod_statuses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub branch_id: Uuid,
    pub status: String,
    pub step: i16,
    pub is_locked: bool,
    pub started_at: DateTimeWithTimeZone,
    pub business_start_time: DateTimeWithTimeZone,
    pub business_end_time: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub started_by: Uuid,
    pub completed_by: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::eod_balance_verifications::Entity")]
    Verifications,
    #[sea_orm(has_many = "super::eod_balance_snapshots::Entity")]
    Snapshots,
}

impl Related<super::eod_balance_verifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Verifications.def()
    }
}

impl Related<super::eod_balance_snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
