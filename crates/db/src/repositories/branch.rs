//! Branch repository: branch metadata, operating state, and balance alerts.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use uuid::Uuid;

use rust_decimal::Decimal;
use satang_core::period::BranchState;
use satang_shared::{AppError, AppResult};

use crate::entities::{
    branch_balance_alerts, branch_currencies, branch_operating_statuses, branches, eod_statuses,
};

use super::db_err;

/// A branch together with its derived operating state.
#[derive(Debug, Clone)]
pub struct BranchStatus {
    /// The branch row.
    pub branch: branches::Model,
    /// Derived operating state.
    pub state: BranchState,
}

/// Branch repository.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    db: DatabaseConnection,
}

impl BranchRepository {
    /// Creates a new branch repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads a branch row.
    pub async fn get(&self, branch_id: Uuid) -> AppResult<branches::Model> {
        branches::Entity::find_by_id(branch_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("branch {branch_id}")))
    }

    /// Loads a branch and derives its operating state from the persisted
    /// flags plus the presence of an in-flight EOD.
    pub async fn status(&self, branch_id: Uuid) -> AppResult<BranchStatus> {
        let branch = self.get(branch_id).await?;

        let operating = branch_operating_statuses::Entity::find()
            .filter(branch_operating_statuses::Column::BranchId.eq(branch_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        let (setup_completed, reset_locked) = operating
            .map(|row| (row.is_initial_setup_completed, row.is_reset_locked))
            .unwrap_or((false, false));

        let eod_in_progress = eod_statuses::Entity::find()
            .filter(eod_statuses::Column::BranchId.eq(branch_id))
            .filter(eod_statuses::Column::Status.eq("processing"))
            .count(&self.db)
            .await
            .map_err(db_err)?
            > 0;

        Ok(BranchStatus {
            branch,
            state: BranchState::from_flags(setup_completed, eod_in_progress, reset_locked),
        })
    }

    /// Currencies enabled for trading at a branch.
    pub async fn enabled_currencies(&self, branch_id: Uuid) -> AppResult<Vec<String>> {
        let rows = branch_currencies::Entity::find()
            .filter(branch_currencies::Column::BranchId.eq(branch_id))
            .filter(branch_currencies::Column::IsEnabled.eq(true))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(|r| r.currency).collect())
    }

    /// Marks initial setup completed and stamps the operating start date.
    pub async fn complete_initial_setup(
        &self,
        branch_id: Uuid,
        initialized_by: Uuid,
    ) -> AppResult<()> {
        let now = Utc::now();
        let existing = branch_operating_statuses::Entity::find()
            .filter(branch_operating_statuses::Column::BranchId.eq(branch_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match existing {
            Some(row) => {
                let mut active: branch_operating_statuses::ActiveModel = row.into();
                active.is_initial_setup_completed = Set(true);
                active.operating_start_date = Set(Some(now.date_naive()));
                active.initialized_by = Set(Some(initialized_by));
                active.updated_at = Set(now.into());
                active.update(&self.db).await.map_err(db_err)?;
            }
            None => {
                let active = branch_operating_statuses::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    branch_id: Set(branch_id),
                    is_initial_setup_completed: Set(true),
                    operating_start_date: Set(Some(now.date_naive())),
                    initialized_by: Set(Some(initialized_by)),
                    reset_count: Set(0),
                    is_reset_locked: Set(false),
                    updated_at: Set(now.into()),
                };
                active.insert(&self.db).await.map_err(db_err)?;
            }
        }
        Ok(())
    }

    /// Sets or clears the administrative reset lock.
    pub async fn set_reset_lock(&self, branch_id: Uuid, locked: bool) -> AppResult<()> {
        let row = branch_operating_statuses::Entity::find()
            .filter(branch_operating_statuses::Column::BranchId.eq(branch_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("branch {branch_id} operating status")))?;
        let reset_count = row.reset_count;
        let mut active: branch_operating_statuses::ActiveModel = row.into();
        active.is_reset_locked = Set(locked);
        if locked {
            active.reset_count = Set(reset_count + 1);
        }
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Lists balance alert thresholds for a branch.
    pub async fn alerts(&self, branch_id: Uuid) -> AppResult<Vec<branch_balance_alerts::Model>> {
        branch_balance_alerts::Entity::find()
            .filter(branch_balance_alerts::Column::BranchId.eq(branch_id))
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Creates or updates an alert threshold pair for a currency.
    pub async fn upsert_alert(
        &self,
        branch_id: Uuid,
        currency: &str,
        warning_threshold: Decimal,
        critical_threshold: Decimal,
    ) -> AppResult<()> {
        if critical_threshold > warning_threshold {
            return Err(AppError::ValidationFailed(format!(
                "critical threshold {critical_threshold} above warning {warning_threshold}"
            )));
        }
        let existing = branch_balance_alerts::Entity::find()
            .filter(branch_balance_alerts::Column::BranchId.eq(branch_id))
            .filter(branch_balance_alerts::Column::Currency.eq(currency))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match existing {
            Some(row) => {
                let mut active: branch_balance_alerts::ActiveModel = row.into();
                active.warning_threshold = Set(warning_threshold);
                active.critical_threshold = Set(critical_threshold);
                active.updated_at = Set(Utc::now().into());
                active.update(&self.db).await.map_err(db_err)?;
            }
            None => {
                let active = branch_balance_alerts::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    branch_id: Set(branch_id),
                    currency: Set(currency.to_string()),
                    warning_threshold: Set(warning_threshold),
                    critical_threshold: Set(critical_threshold),
                    updated_at: Set(Utc::now().into()),
                };
                active.insert(&self.db).await.map_err(db_err)?;
            }
        }
        Ok(())
    }
}
