use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use super::errors::RepositoryError;
use super::rows::uuid_at;
use crate::database::DatabasePool;
use crate::models::notification::PushSubscription;

/// Repository trait for push subscriptions
#[async_trait]
pub trait PushSubscriptionRepositoryTrait {
    /// Register an endpoint; re-registering moves it to `user_id`
    async fn upsert(&self, user_id: &str, endpoint: &str) -> Result<PushSubscription, RepositoryError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PushSubscription>, RepositoryError>;

    /// Remove one of the user's subscriptions
    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError>;

    /// Remove a subscription the gateway reported as gone
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

/// SQLite-backed push subscription repository
#[derive(Debug, Clone)]
pub struct PushSubscriptionRepository {
    pool: DatabasePool,
}

impl PushSubscriptionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<PushSubscription> {
        Ok(PushSubscription {
            id: uuid_at(row, 0)?,
            user_id: row.get(1)?,
            endpoint: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

#[async_trait]
impl PushSubscriptionRepositoryTrait for PushSubscriptionRepository {
    async fn upsert(&self, user_id: &str, endpoint: &str) -> Result<PushSubscription, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO push_subscriptions (id, user_id, endpoint, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(endpoint) DO UPDATE SET user_id = excluded.user_id",
            params![Uuid::new_v4().to_string(), user_id, endpoint, Utc::now()],
        )?;
        let subscription = conn.query_row(
            "SELECT id, user_id, endpoint, created_at FROM push_subscriptions WHERE endpoint = ?1",
            params![endpoint],
            Self::map_row,
        )?;
        Ok(subscription)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PushSubscription>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, endpoint, created_at FROM push_subscriptions WHERE user_id = ?1
             ORDER BY created_at ASC",
        )?;
        let subscriptions = stmt
            .query_map(params![user_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(subscriptions)
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM push_subscriptions WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id],
        )?;
        Ok(deleted > 0)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM push_subscriptions WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_moves_endpoint_between_users() {
        let repo = PushSubscriptionRepository::new(DatabasePool::in_memory().unwrap());

        let first = repo.upsert("user-1", "device-abc").await.unwrap();
        let second = repo.upsert("user-2", "device-abc").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.user_id, "user-2");
        assert!(repo.list_for_user("user-1").await.unwrap().is_empty());
        assert_eq!(repo.list_for_user("user-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let repo = PushSubscriptionRepository::new(DatabasePool::in_memory().unwrap());
        let subscription = repo.upsert("user-1", "device-xyz").await.unwrap();

        assert!(!repo.delete("user-2", subscription.id).await.unwrap());
        assert!(repo.delete_by_id(subscription.id).await.unwrap());
        assert!(!repo.delete_by_id(subscription.id).await.unwrap());
    }
}
