//! Rate repository: daily buy/sell rates per (branch, currency).
//!
//! Rates are drafted, then published as a set. Published-ness is not a
//! flag on the rate row: a rate is published when a `rate_publishes`
//! record covers it, and a day's records accumulate across multiple
//! publishes. Only covered rates drive trades. A new day's draft inherits
//! each currency's `sort_order` from the most recent earlier day so the
//! board keeps its layout.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use uuid::Uuid;

use satang_shared::{AppError, AppResult};

use crate::entities::{rate_publishes, rates};

use super::db_err;

/// One currency's rate pair for upsert.
#[derive(Debug, Clone)]
pub struct RateItem {
    /// Currency code.
    pub currency: String,
    /// Rate the branch pays when buying.
    pub buy_rate: Decimal,
    /// Rate the branch charges when selling.
    pub sell_rate: Decimal,
    /// Board position; `None` inherits from the previous day.
    pub sort_order: Option<i32>,
}

/// A board row: the rate plus whether a publish record covers it.
#[derive(Debug, Clone, Serialize)]
pub struct BoardRate {
    /// The rate row.
    #[serde(flatten)]
    pub rate: rates::Model,
    /// True when a publish record covers the rate.
    pub is_published: bool,
}

fn board_rows(rows: Vec<rates::Model>, published: &HashSet<Uuid>) -> Vec<BoardRate> {
    rows.into_iter()
        .map(|rate| {
            let is_published = published.contains(&rate.id);
            BoardRate { rate, is_published }
        })
        .collect()
}

/// Rate repository.
#[derive(Debug, Clone)]
pub struct RateRepository {
    db: DatabaseConnection,
}

impl RateRepository {
    /// Creates a new rate repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Ids of the rates a publish record covers for this branch and date.
    async fn published_ids(&self, branch_id: Uuid, date: NaiveDate) -> AppResult<HashSet<Uuid>> {
        let records = rate_publishes::Entity::find()
            .filter(rate_publishes::Column::BranchId.eq(branch_id))
            .filter(rate_publishes::Column::PublishDate.eq(date))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(records.into_iter().map(|r| r.rate_id).collect())
    }

    /// All rates for a branch on a date, board order.
    pub async fn for_date(
        &self,
        branch_id: Uuid,
        date: NaiveDate,
        published_only: bool,
    ) -> AppResult<Vec<BoardRate>> {
        let rows = rates::Entity::find()
            .filter(rates::Column::BranchId.eq(branch_id))
            .filter(rates::Column::RateDate.eq(date))
            .order_by_asc(rates::Column::SortOrder)
            .order_by_asc(rates::Column::Currency)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let published = self.published_ids(branch_id, date).await?;
        let mut board = board_rows(rows, &published);
        if published_only {
            board.retain(|r| r.is_published);
        }
        Ok(board)
    }

    /// The published rate for one currency on a date, when any.
    pub async fn published_rate(
        &self,
        branch_id: Uuid,
        currency: &str,
        date: NaiveDate,
    ) -> AppResult<Option<rates::Model>> {
        let row = rates::Entity::find()
            .filter(rates::Column::BranchId.eq(branch_id))
            .filter(rates::Column::Currency.eq(currency))
            .filter(rates::Column::RateDate.eq(date))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        let Some(row) = row else { return Ok(None) };

        let covered = rate_publishes::Entity::find()
            .filter(rate_publishes::Column::RateId.eq(row.id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(covered.map(|_| row))
    }

    /// The published USD sell rate for a date; drives the reporting
    /// threshold check.
    pub async fn usd_sell_rate(
        &self,
        branch_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Option<Decimal>> {
        Ok(self
            .published_rate(branch_id, "USD", date)
            .await?
            .map(|r| r.sell_rate))
    }

    /// Creates or updates draft rates for a date.
    pub async fn upsert(
        &self,
        branch_id: Uuid,
        date: NaiveDate,
        updated_by: Uuid,
        items: &[RateItem],
    ) -> AppResult<()> {
        for item in items {
            if item.buy_rate <= Decimal::ZERO || item.sell_rate <= Decimal::ZERO {
                return Err(AppError::ValidationFailed(format!(
                    "non-positive rate for {}",
                    item.currency
                )));
            }

            let sort_order = match item.sort_order {
                Some(order) => order,
                None => self.inherited_sort_order(branch_id, &item.currency, date).await?,
            };

            let existing = rates::Entity::find()
                .filter(rates::Column::BranchId.eq(branch_id))
                .filter(rates::Column::Currency.eq(&item.currency))
                .filter(rates::Column::RateDate.eq(date))
                .one(&self.db)
                .await
                .map_err(db_err)?;

            match existing {
                Some(row) => {
                    let mut active: rates::ActiveModel = row.into();
                    active.buy_rate = Set(item.buy_rate);
                    active.sell_rate = Set(item.sell_rate);
                    active.sort_order = Set(sort_order);
                    active.updated_by = Set(updated_by);
                    active.updated_at = Set(Utc::now().into());
                    active.update(&self.db).await.map_err(db_err)?;
                }
                None => {
                    let active = rates::ActiveModel {
                        id: Set(Uuid::now_v7()),
                        branch_id: Set(branch_id),
                        currency: Set(item.currency.clone()),
                        rate_date: Set(date),
                        buy_rate: Set(item.buy_rate),
                        sell_rate: Set(item.sell_rate),
                        sort_order: Set(sort_order),
                        updated_by: Set(updated_by),
                        created_at: Set(Utc::now().into()),
                        updated_at: Set(Utc::now().into()),
                    };
                    active.insert(&self.db).await.map_err(db_err)?;
                }
            }
        }
        Ok(())
    }

    /// Publishes the date's uncovered drafts by appending publish records;
    /// returns how many were covered by this call.
    pub async fn publish(
        &self,
        branch_id: Uuid,
        date: NaiveDate,
        published_by: Uuid,
    ) -> AppResult<u64> {
        let rows = rates::Entity::find()
            .filter(rates::Column::BranchId.eq(branch_id))
            .filter(rates::Column::RateDate.eq(date))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let published = self.published_ids(branch_id, date).await?;

        let mut count = 0;
        for row in rows {
            if published.contains(&row.id) {
                continue;
            }
            let active = rate_publishes::ActiveModel {
                id: Set(Uuid::now_v7()),
                rate_id: Set(row.id),
                branch_id: Set(branch_id),
                publish_date: Set(date),
                published_by: Set(published_by),
                published_at: Set(Utc::now().into()),
            };
            active.insert(&self.db).await.map_err(db_err)?;
            count += 1;
        }
        Ok(count)
    }

    async fn inherited_sort_order(
        &self,
        branch_id: Uuid,
        currency: &str,
        before: NaiveDate,
    ) -> AppResult<i32> {
        let previous = rates::Entity::find()
            .filter(rates::Column::BranchId.eq(branch_id))
            .filter(rates::Column::Currency.eq(currency))
            .filter(rates::Column::RateDate.lt(before))
            .order_by_desc(rates::Column::RateDate)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(previous.map_or(0, |r| r.sort_order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rate(currency: &str) -> rates::Model {
        rates::Model {
            id: Uuid::now_v7(),
            branch_id: Uuid::new_v4(),
            currency: currency.to_string(),
            rate_date: NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(),
            buy_rate: dec!(35),
            sell_rate: dec!(35.5),
            sort_order: 0,
            updated_by: Uuid::new_v4(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_board_published_derives_from_publish_records() {
        let covered = rate("USD");
        let draft = rate("EUR");
        let published: HashSet<Uuid> = [covered.id].into();

        let board = board_rows(vec![covered, draft], &published);
        assert!(board[0].is_published);
        assert!(!board[1].is_published);
    }
}
