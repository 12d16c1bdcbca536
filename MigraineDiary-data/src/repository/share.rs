use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::errors::RepositoryError;
use super::rows::uuid_at;
use crate::database::DatabasePool;
use crate::models::share::{DoctorShare, NewDoctorShare};

const SHARE_COLUMNS: &str =
    "id, user_id, code, from_date, to_date, include_notes, created_at, expires_at, revoked_at, last_accessed_at";

/// Repository trait for physician shares
#[async_trait]
pub trait ShareRepositoryTrait {
    /// Store a share; `Conflict` when the code is already taken
    async fn create(&self, share: NewDoctorShare) -> Result<DoctorShare, RepositoryError>;

    /// All of a user's shares, newest first
    async fn list(&self, user_id: &str) -> Result<Vec<DoctorShare>, RepositoryError>;

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<DoctorShare>, RepositoryError>;

    /// Look a share up by its normalized code, whatever its state
    async fn find_by_code(&self, code: &str) -> Result<Option<DoctorShare>, RepositoryError>;

    /// Revoke a share; false when it does not exist or was already revoked
    async fn revoke(&self, user_id: &str, id: Uuid, now: DateTime<Utc>) -> Result<bool, RepositoryError>;

    /// Record a physician access
    async fn touch(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), RepositoryError>;
}

/// SQLite-backed share repository
#[derive(Debug, Clone)]
pub struct ShareRepository {
    pool: DatabasePool,
}

impl ShareRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<DoctorShare> {
        Ok(DoctorShare {
            id: uuid_at(row, 0)?,
            user_id: row.get(1)?,
            code: row.get(2)?,
            from_date: row.get(3)?,
            to_date: row.get(4)?,
            include_notes: row.get(5)?,
            created_at: row.get(6)?,
            expires_at: row.get(7)?,
            revoked_at: row.get(8)?,
            last_accessed_at: row.get(9)?,
        })
    }
}

#[async_trait]
impl ShareRepositoryTrait for ShareRepository {
    async fn create(&self, share: NewDoctorShare) -> Result<DoctorShare, RepositoryError> {
        let created = DoctorShare {
            id: Uuid::new_v4(),
            user_id: share.user_id,
            code: share.code,
            from_date: share.from_date,
            to_date: share.to_date,
            include_notes: share.include_notes,
            created_at: Utc::now(),
            expires_at: share.expires_at,
            revoked_at: None,
            last_accessed_at: None,
        };

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO doctor_shares ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                SHARE_COLUMNS
            ),
            params![
                created.id.to_string(),
                created.user_id,
                created.code,
                created.from_date,
                created.to_date,
                created.include_notes,
                created.created_at,
                created.expires_at,
                created.revoked_at,
                created.last_accessed_at,
            ],
        )?;
        Ok(created)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<DoctorShare>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM doctor_shares WHERE user_id = ?1 ORDER BY created_at DESC",
            SHARE_COLUMNS
        ))?;
        let shares = stmt
            .query_map(params![user_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shares)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<DoctorShare>, RepositoryError> {
        let conn = self.pool.get()?;
        let share = conn
            .query_row(
                &format!("SELECT {} FROM doctor_shares WHERE id = ?1 AND user_id = ?2", SHARE_COLUMNS),
                params![id.to_string(), user_id],
                Self::map_row,
            )
            .optional()?;
        Ok(share)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<DoctorShare>, RepositoryError> {
        let conn = self.pool.get()?;
        let share = conn
            .query_row(
                &format!("SELECT {} FROM doctor_shares WHERE code = ?1", SHARE_COLUMNS),
                params![code],
                Self::map_row,
            )
            .optional()?;
        Ok(share)
    }

    async fn revoke(&self, user_id: &str, id: Uuid, now: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE doctor_shares SET revoked_at = ?3 WHERE id = ?1 AND user_id = ?2 AND revoked_at IS NULL",
            params![id.to_string(), user_id, now],
        )?;
        Ok(changed > 0)
    }

    async fn touch(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE doctor_shares SET last_accessed_at = ?2 WHERE id = ?1",
            params![id.to_string(), now],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn new_share(code: &str) -> NewDoctorShare {
        NewDoctorShare {
            user_id: "user-1".to_string(),
            code: code.to_string(),
            from_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            include_notes: false,
            expires_at: Utc::now() + Duration::hours(24),
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let repo = ShareRepository::new(DatabasePool::in_memory().unwrap());
        repo.create(new_share("ABCD2345")).await.unwrap();

        let result = repo.create(new_share("ABCD2345")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_revoke_once_and_touch() {
        let repo = ShareRepository::new(DatabasePool::in_memory().unwrap());
        let share = repo.create(new_share("WXYZ6789")).await.unwrap();
        let now = Utc::now();

        assert!(!repo.revoke("user-2", share.id, now).await.unwrap());
        assert!(repo.revoke("user-1", share.id, now).await.unwrap());
        assert!(!repo.revoke("user-1", share.id, now).await.unwrap());

        repo.touch(share.id, now).await.unwrap();
        let stored = repo.find_by_code("WXYZ6789").await.unwrap().unwrap();
        assert_eq!(stored.revoked_at, Some(now));
        assert_eq!(stored.last_accessed_at, Some(now));
        assert!(!stored.is_active(now));
    }
}
