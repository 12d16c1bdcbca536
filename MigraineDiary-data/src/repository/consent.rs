use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::errors::RepositoryError;
use super::rows::{parsed_at, uuid_at};
use crate::database::DatabasePool;
use crate::models::consent::{ConsentType, UserConsent};

const CONSENT_COLUMNS: &str = "id, user_id, consent_type, version, granted_at, withdrawn_at";

/// Repository trait for consent records.
///
/// At most one grant per user and type is active (not withdrawn) at a time.
#[async_trait]
pub trait ConsentRepositoryTrait {
    /// Grant consent for `version`. Granting the active version again returns
    /// the existing record; a new version supersedes the old grant.
    async fn grant(
        &self,
        user_id: &str,
        consent_type: ConsentType,
        version: &str,
        now: DateTime<Utc>,
    ) -> Result<UserConsent, RepositoryError>;

    /// Full history, newest first
    async fn list(&self, user_id: &str) -> Result<Vec<UserConsent>, RepositoryError>;

    async fn active(&self, user_id: &str, consent_type: ConsentType) -> Result<Option<UserConsent>, RepositoryError>;

    /// Withdraw the active grant; false when there was none
    async fn withdraw(
        &self,
        user_id: &str,
        consent_type: ConsentType,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

/// SQLite-backed consent repository
#[derive(Debug, Clone)]
pub struct ConsentRepository {
    pool: DatabasePool,
}

impl ConsentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<UserConsent> {
        Ok(UserConsent {
            id: uuid_at(row, 0)?,
            user_id: row.get(1)?,
            consent_type: parsed_at(row, 2)?,
            version: row.get(3)?,
            granted_at: row.get(4)?,
            withdrawn_at: row.get(5)?,
        })
    }

    fn select_active(conn: &rusqlite::Connection, user_id: &str, consent_type: ConsentType) -> rusqlite::Result<Option<UserConsent>> {
        conn.query_row(
            &format!(
                "SELECT {} FROM user_consents WHERE user_id = ?1 AND consent_type = ?2 AND withdrawn_at IS NULL
                 ORDER BY granted_at DESC LIMIT 1",
                CONSENT_COLUMNS
            ),
            params![user_id, consent_type.as_str()],
            Self::map_row,
        )
        .optional()
    }
}

#[async_trait]
impl ConsentRepositoryTrait for ConsentRepository {
    async fn grant(
        &self,
        user_id: &str,
        consent_type: ConsentType,
        version: &str,
        now: DateTime<Utc>,
    ) -> Result<UserConsent, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        if let Some(existing) = Self::select_active(&tx, user_id, consent_type)? {
            if existing.version == version {
                return Ok(existing);
            }
        }

        tx.execute(
            "UPDATE user_consents SET withdrawn_at = ?3
             WHERE user_id = ?1 AND consent_type = ?2 AND withdrawn_at IS NULL",
            params![user_id, consent_type.as_str(), now],
        )?;

        let consent = UserConsent {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            consent_type,
            version: version.to_string(),
            granted_at: now,
            withdrawn_at: None,
        };
        tx.execute(
            &format!("INSERT INTO user_consents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", CONSENT_COLUMNS),
            params![
                consent.id.to_string(),
                consent.user_id,
                consent.consent_type.as_str(),
                consent.version,
                consent.granted_at,
                consent.withdrawn_at,
            ],
        )?;
        tx.commit()?;

        Ok(consent)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<UserConsent>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM user_consents WHERE user_id = ?1 ORDER BY granted_at DESC",
            CONSENT_COLUMNS
        ))?;
        let consents = stmt
            .query_map(params![user_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(consents)
    }

    async fn active(&self, user_id: &str, consent_type: ConsentType) -> Result<Option<UserConsent>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(Self::select_active(&conn, user_id, consent_type)?)
    }

    async fn withdraw(
        &self,
        user_id: &str,
        consent_type: ConsentType,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE user_consents SET withdrawn_at = ?3
             WHERE user_id = ?1 AND consent_type = ?2 AND withdrawn_at IS NULL",
            params![user_id, consent_type.as_str(), now],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_grant_same_version_is_idempotent() {
        let repo = ConsentRepository::new(DatabasePool::in_memory().unwrap());
        let now = Utc::now();

        let first = repo.grant("user-1", ConsentType::AiAnalysis, "1.0", now).await.unwrap();
        let again = repo
            .grant("user-1", ConsentType::AiAnalysis, "1.0", now + Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(repo.list("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_version_supersedes_and_withdraw() {
        let repo = ConsentRepository::new(DatabasePool::in_memory().unwrap());
        let now = Utc::now();

        repo.grant("user-1", ConsentType::DoctorSharing, "1.0", now).await.unwrap();
        let second = repo
            .grant("user-1", ConsentType::DoctorSharing, "2.0", now + Duration::days(1))
            .await
            .unwrap();

        let active = repo.active("user-1", ConsentType::DoctorSharing).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(repo.list("user-1").await.unwrap().len(), 2);

        assert!(repo.withdraw("user-1", ConsentType::DoctorSharing, now).await.unwrap());
        assert!(!repo.withdraw("user-1", ConsentType::DoctorSharing, now).await.unwrap());
        assert!(repo.active("user-1", ConsentType::DoctorSharing).await.unwrap().is_none());
    }
}
