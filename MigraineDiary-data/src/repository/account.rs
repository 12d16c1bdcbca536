use std::collections::BTreeMap;

use async_trait::async_trait;
use rusqlite::params;
use tracing::info;

use super::errors::RepositoryError;
use crate::database::DatabasePool;

/// Tables holding rows owned by a user, in deletion order.
/// Weather observations are shared between users and are never erased here.
const USER_TABLES: &[&str] = &[
    "pain_entries",
    "user_medications",
    "medication_limits",
    "reminders",
    "push_subscriptions",
    "doctor_shares",
    "hit6_assessments",
    "user_consents",
];

/// Repository trait for whole-account operations
#[async_trait]
pub trait AccountRepositoryTrait {
    /// Erase every row owned by `user_id` in one transaction and return the
    /// number of rows removed per table
    async fn delete_all(&self, user_id: &str) -> Result<BTreeMap<String, usize>, RepositoryError>;
}

/// SQLite-backed account repository
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: DatabasePool,
}

impl AccountRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepositoryTrait for AccountRepository {
    async fn delete_all(&self, user_id: &str) -> Result<BTreeMap<String, usize>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let mut counts = BTreeMap::new();
        for table in USER_TABLES {
            let deleted = tx.execute(&format!("DELETE FROM {} WHERE user_id = ?1", table), params![user_id])?;
            counts.insert(table.to_string(), deleted);
        }
        tx.commit()?;

        info!(user_id, total = counts.values().sum::<usize>(), "Deleted account data");
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::NewPainEntry;
    use crate::repository::{ConsentRepository, ConsentRepositoryTrait, EntryRepository, EntryRepositoryTrait};
    use crate::models::consent::ConsentType;
    use chrono::Utc;

    fn entry(user_id: &str) -> NewPainEntry {
        NewPainEntry {
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
            pain_level: 5,
            pain_location: None,
            aura_type: None,
            triggers: vec![],
            medications: vec![],
            me_cfs_severity: None,
            notes: None,
            latitude: None,
            longitude: None,
        }
    }

    #[tokio::test]
    async fn test_delete_all_only_touches_owner() {
        let pool = DatabasePool::in_memory().unwrap();
        let entries = EntryRepository::new(pool.clone());
        let consents = ConsentRepository::new(pool.clone());
        let account = AccountRepository::new(pool);

        entries.create(entry("user-1")).await.unwrap();
        entries.create(entry("user-1")).await.unwrap();
        entries.create(entry("user-2")).await.unwrap();
        consents
            .grant("user-1", ConsentType::HealthData, "1.0", Utc::now())
            .await
            .unwrap();

        let counts = account.delete_all("user-1").await.unwrap();
        assert_eq!(counts["pain_entries"], 2);
        assert_eq!(counts["user_consents"], 1);
        assert_eq!(counts["reminders"], 0);
        assert_eq!(counts.len(), USER_TABLES.len());

        let filter = crate::models::entry::EntryFilter::default();
        assert_eq!(entries.list("user-1", &filter).await.unwrap().1, 0);
        assert_eq!(entries.list("user-2", &filter).await.unwrap().1, 1);
    }
}
