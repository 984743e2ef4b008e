//! Balance repository: the per-(branch, currency) cash position cache.
//!
//! Balances are denormalised from the ledger for fast reads. All writes go
//! through `apply_delta` inside the same database transaction as the ledger
//! append, under row locks taken in the fixed (foreign, base) order so
//! concurrent operations on the same till cannot deadlock.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set,
};
use uuid::Uuid;

use satang_shared::{AppError, AppResult};

use crate::entities::balances;

use super::db_err;

/// Balance repository.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists all balances for a branch.
    pub async fn list(&self, branch_id: Uuid) -> AppResult<Vec<balances::Model>> {
        balances::Entity::find()
            .filter(balances::Column::BranchId.eq(branch_id))
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Reads a single balance; absent rows read as zero.
    pub async fn get(&self, branch_id: Uuid, currency: &str) -> AppResult<Decimal> {
        let row = balances::Entity::find()
            .filter(balances::Column::BranchId.eq(branch_id))
            .filter(balances::Column::Currency.eq(currency))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(|r| r.balance).unwrap_or(Decimal::ZERO))
    }

    /// Locks the balance rows an operation will touch and returns their
    /// current values, keyed by currency.
    ///
    /// Rows are locked one at a time: the foreign currencies in sorted
    /// order, then the base currency last. Every transaction takes its
    /// locks in this order. Absent rows read as zero and are created on
    /// the first `apply_delta`.
    pub(crate) async fn lock_in_order<C: ConnectionTrait>(
        txn: &C,
        branch_id: Uuid,
        foreign: &[String],
        base_currency: &str,
    ) -> AppResult<HashMap<String, Decimal>> {
        let mut ordered: Vec<&str> = foreign
            .iter()
            .map(String::as_str)
            .filter(|c| *c != base_currency)
            .collect();
        ordered.sort_unstable();
        ordered.dedup();
        ordered.push(base_currency);

        let mut out = HashMap::with_capacity(ordered.len());
        for currency in ordered {
            let row = balances::Entity::find()
                .filter(balances::Column::BranchId.eq(branch_id))
                .filter(balances::Column::Currency.eq(currency))
                .lock_exclusive()
                .one(txn)
                .await
                .map_err(db_err)?;
            out.insert(
                currency.to_string(),
                row.map(|r| r.balance).unwrap_or(Decimal::ZERO),
            );
        }
        Ok(out)
    }

    /// Applies a signed delta to a balance row, creating it when absent.
    ///
    /// Must run inside the transaction that locked the row.
    pub(crate) async fn apply_delta<C: ConnectionTrait>(
        txn: &C,
        branch_id: Uuid,
        currency: &str,
        delta: Decimal,
    ) -> AppResult<Decimal> {
        if delta == Decimal::ZERO {
            return balances::Entity::find()
                .filter(balances::Column::BranchId.eq(branch_id))
                .filter(balances::Column::Currency.eq(currency))
                .one(txn)
                .await
                .map_err(db_err)
                .map(|row| row.map(|r| r.balance).unwrap_or(Decimal::ZERO));
        }

        let existing = balances::Entity::find()
            .filter(balances::Column::BranchId.eq(branch_id))
            .filter(balances::Column::Currency.eq(currency))
            .one(txn)
            .await
            .map_err(db_err)?;

        match existing {
            Some(row) => {
                let next = row.balance + delta;
                let mut active: balances::ActiveModel = row.into();
                active.balance = Set(next);
                active.updated_at = Set(Utc::now().into());
                active.update(txn).await.map_err(db_err)?;
                Ok(next)
            }
            None => {
                let active = balances::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    branch_id: Set(branch_id),
                    currency: Set(currency.to_string()),
                    balance: Set(delta),
                    updated_at: Set(Utc::now().into()),
                };
                active.insert(txn).await.map_err(db_err)?;
                Ok(delta)
            }
        }
    }

    /// Overwrites a balance row to an absolute value.
    ///
    /// Only the administrative set-to-zero path uses this; it writes no
    /// ledger entry, so the caller must have verified the currency carries
    /// no initial-balance entry.
    pub(crate) async fn set_absolute<C: ConnectionTrait>(
        txn: &C,
        branch_id: Uuid,
        currency: &str,
        value: Decimal,
    ) -> AppResult<()> {
        let existing = balances::Entity::find()
            .filter(balances::Column::BranchId.eq(branch_id))
            .filter(balances::Column::Currency.eq(currency))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?;

        match existing {
            Some(row) => {
                let mut active: balances::ActiveModel = row.into();
                active.balance = Set(value);
                active.updated_at = Set(Utc::now().into());
                active.update(txn).await.map_err(db_err)?;
            }
            None => {
                let active = balances::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    branch_id: Set(branch_id),
                    currency: Set(currency.to_string()),
                    balance: Set(value),
                    updated_at: Set(Utc::now().into()),
                };
                active.insert(txn).await.map_err(db_err)?;
            }
        }
        Ok(())
    }

    /// Fails when a balance row would go negative; used as a final guard
    /// after the planner checks.
    pub(crate) fn guard_non_negative(currency: &str, value: Decimal) -> AppResult<()> {
        if value < Decimal::ZERO {
            return Err(AppError::BalanceInsufficient(format!(
                "{currency} would go negative ({value})"
            )));
        }
        Ok(())
    }
}
