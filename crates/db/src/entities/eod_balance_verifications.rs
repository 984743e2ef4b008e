//! `SeaORM` Entity for eod_balance_verifications table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "eod_balance_verifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub eod_status_id: Uuid,
    pub currency: String,
    pub theoretical_balance: Decimal,
    pub actual_balance: Decimal,
    pub difference: Decimal,
    pub adjustment_entry_id: Option<Uuid>,
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
