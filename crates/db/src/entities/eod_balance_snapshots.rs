//! `SeaORM` Entity for eod_balance_snapshots table.
//!
//! Legacy opening-balance path, kept behind a config flag.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "eod_balance_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub eod_status_id: Uuid,
    pub branch_id: Uuid,
    pub currency: String,
    pub remaining_balance: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::eod_statuses::Entity",
        from = "Column::EodStatusId",
        to = "super::eod_statuses::Column::Id"
    )]
    EodStatuses,
}

impl Related<super::eod_statuses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EodStatuses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
