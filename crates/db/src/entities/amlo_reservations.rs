//! `SeaORM` Entity for amlo_reservations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "amlo_reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub reservation_no: String,
    pub serial: i32,
    pub branch_id: Uuid,
    pub customer_name: String,
    pub customer_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub direction: String,
    pub report_type: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub audited_by: Option<Uuid>,
    pub created_by: Uuid,
    pub linked_transaction_id: Option<Uuid>,
    pub form_data: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::amlo_reports::Entity")]
    Reports,
}

impl Related<super::amlo_reports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
