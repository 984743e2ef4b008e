//! `SeaORM` Entity for eod_session_locks table.
//!
//! Records which operator session owns the active EOD; an HTTP-layer
//! convenience, never an authority over ledger state.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "eod_session_locks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub eod_status_id: Uuid,
    pub operator_id: Uuid,
    pub acquired_at: DateTimeWithTimeZone,
    pub released_at: Option<DateTimeWithTimeZone>,
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
