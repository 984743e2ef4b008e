//! Session repository: operator sessions and the EOD session lock.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use satang_shared::{AppError, AppResult};

use crate::entities::{eod_session_locks, sessions};

use super::db_err;

/// Session repository.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    /// Creates a new session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a session for an operator.
    pub async fn create(
        &self,
        operator_id: Uuid,
        branch_id: Uuid,
        ttl_hours: i64,
    ) -> AppResult<sessions::Model> {
        let now = Utc::now();
        let active = sessions::ActiveModel {
            id: Set(Uuid::now_v7()),
            operator_id: Set(operator_id),
            branch_id: Set(branch_id),
            expires_at: Set((now + Duration::hours(ttl_hours)).into()),
            revoked_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        active.insert(&self.db).await.map_err(db_err)
    }

    /// Loads a session that is neither expired nor revoked.
    pub async fn find_valid(&self, session_id: Uuid) -> AppResult<sessions::Model> {
        let model = sessions::Entity::find_by_id(session_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::Unauthorized("unknown session".to_string()))?;
        if model.revoked_at.is_some() || model.expires_at.to_utc() < Utc::now() {
            return Err(AppError::Unauthorized("session expired".to_string()));
        }
        Ok(model)
    }

    /// Revokes a session.
    pub async fn revoke(&self, session_id: Uuid) -> AppResult<()> {
        let model = sessions::Entity::find_by_id(session_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;
        let mut active: sessions::ActiveModel = model.into();
        active.revoked_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Deletes sessions whose expiry lies more than `expire_hours` in the
    /// past. Returns how many were removed.
    pub async fn cleanup_expired(&self, expire_hours: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::hours(expire_hours);
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    /// Takes the EOD session lock: one operator drives one settlement.
    pub async fn acquire_eod_lock(
        &self,
        eod_status_id: Uuid,
        operator_id: Uuid,
    ) -> AppResult<eod_session_locks::Model> {
        let held = eod_session_locks::Entity::find()
            .filter(eod_session_locks::Column::EodStatusId.eq(eod_status_id))
            .filter(eod_session_locks::Column::ReleasedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if let Some(lock) = held {
            if lock.operator_id == operator_id {
                return Ok(lock);
            }
            return Err(AppError::ConcurrentEod(format!(
                "settlement {eod_status_id} is driven by another operator"
            )));
        }

        let active = eod_session_locks::ActiveModel {
            id: Set(Uuid::now_v7()),
            eod_status_id: Set(eod_status_id),
            operator_id: Set(operator_id),
            acquired_at: Set(Utc::now().into()),
            released_at: Set(None),
        };
        active.insert(&self.db).await.map_err(db_err)
    }

    /// Releases the EOD session lock.
    pub async fn release_eod_lock(&self, eod_status_id: Uuid) -> AppResult<()> {
        let held = eod_session_locks::Entity::find()
            .filter(eod_session_locks::Column::EodStatusId.eq(eod_status_id))
            .filter(eod_session_locks::Column::ReleasedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if let Some(lock) = held {
            let mut active: eod_session_locks::ActiveModel = lock.into();
            active.released_at = Set(Some(Utc::now().into()));
            active.update(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }
}
