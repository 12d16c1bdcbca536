use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::errors::RepositoryError;
use super::rows::{json_at, uuid_at};
use crate::database::DatabasePool;
use crate::models::assessment::{Hit6Assessment, NewHit6Assessment};

/// Repository trait for HIT-6 results
#[async_trait]
pub trait AssessmentRepositoryTrait {
    async fn create(&self, assessment: NewHit6Assessment) -> Result<Hit6Assessment, RepositoryError>;

    /// Results newest first, optionally capped
    async fn list(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<Hit6Assessment>, RepositoryError>;

    async fn latest(&self, user_id: &str) -> Result<Option<Hit6Assessment>, RepositoryError>;
}

/// SQLite-backed assessment repository
#[derive(Debug, Clone)]
pub struct AssessmentRepository {
    pool: DatabasePool,
}

impl AssessmentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Hit6Assessment> {
        Ok(Hit6Assessment {
            id: uuid_at(row, 0)?,
            user_id: row.get(1)?,
            answers: json_at(row, 2)?,
            score: row.get(3)?,
            completed_at: row.get(4)?,
        })
    }
}

#[async_trait]
impl AssessmentRepositoryTrait for AssessmentRepository {
    async fn create(&self, assessment: NewHit6Assessment) -> Result<Hit6Assessment, RepositoryError> {
        let created = Hit6Assessment {
            id: Uuid::new_v4(),
            user_id: assessment.user_id,
            answers: assessment.answers,
            score: assessment.score,
            completed_at: assessment.completed_at,
        };

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO hit6_assessments (id, user_id, answers, score, completed_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                created.id.to_string(),
                created.user_id,
                serde_json::to_string(&created.answers)?,
                created.score,
                created.completed_at,
            ],
        )?;
        Ok(created)
    }

    async fn list(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<Hit6Assessment>, RepositoryError> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, answers, score, completed_at FROM hit6_assessments
             WHERE user_id = ?1 ORDER BY completed_at DESC LIMIT ?2",
        )?;
        let assessments = stmt
            .query_map(params![user_id, limit], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assessments)
    }

    async fn latest(&self, user_id: &str) -> Result<Option<Hit6Assessment>, RepositoryError> {
        let conn = self.pool.get()?;
        let assessment = conn
            .query_row(
                "SELECT id, user_id, answers, score, completed_at FROM hit6_assessments
                 WHERE user_id = ?1 ORDER BY completed_at DESC LIMIT 1",
                params![user_id],
                Self::map_row,
            )
            .optional()?;
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_latest_and_limit() {
        let repo = AssessmentRepository::new(DatabasePool::in_memory().unwrap());
        let now = Utc::now();

        for (days_ago, score) in [(60, 66u8), (30, 60), (1, 52)] {
            repo.create(NewHit6Assessment {
                user_id: "user-1".to_string(),
                answers: vec![6, 8, 10, 10, 10, 8],
                score,
                completed_at: now - Duration::days(days_ago),
            })
            .await
            .unwrap();
        }

        let latest = repo.latest("user-1").await.unwrap().unwrap();
        assert_eq!(latest.score, 52);
        assert_eq!(latest.answers, vec![6, 8, 10, 10, 10, 8]);

        assert_eq!(repo.list("user-1", Some(2)).await.unwrap().len(), 2);
        assert_eq!(repo.list("user-1", None).await.unwrap().len(), 3);
        assert!(repo.latest("user-2").await.unwrap().is_none());
    }
}
