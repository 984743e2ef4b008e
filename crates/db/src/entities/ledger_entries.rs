//! `SeaORM` Entity for ledger_entries table.
//!
//! Append-only: rows are never mutated after insert except to flip
//! `status` to `reversed` and to record receipt metadata.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_no: String,
    pub daily_sequence: i32,
    pub entry_type: String,
    pub branch_id: Uuid,
    pub currency: String,
    pub operator_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_id: Option<String>,
    pub purpose: Option<String>,
    pub remarks: Option<String>,
    pub amount: Decimal,
    pub rate: Decimal,
    pub local_amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub transaction_date: Date,
    pub created_at: DateTimeWithTimeZone,
    pub status: String,
    pub original_transaction_no: Option<String>,
    pub business_group_id: Option<Uuid>,
    pub group_sequence: Option<i32>,
    pub receipt_filename: Option<String>,
    pub print_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::branches::Entity",
        from = "Column::BranchId",
        to = "super::branches::Column::Id"
    )]
    Branches,
}

impl Related<super::branches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
