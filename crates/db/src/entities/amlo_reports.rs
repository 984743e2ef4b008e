//! `SeaORM` Entity for amlo_reports table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "amlo_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub report_type: String,
    pub transaction_amount: Decimal,
    pub transaction_date: Date,
    pub is_reported: bool,
    pub report_time: Option<DateTimeWithTimeZone>,
    pub reported_by: Option<Uuid>,
    pub pdf_filename: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::amlo_reservations::Entity",
        from = "Column::ReservationId",
        to = "super::amlo_reservations::Column::Id"
    )]
    Reservations,
}

impl Related<super::amlo_reservations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
