use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::errors::RepositoryError;
use super::rows::{parsed_at, uuid_at};
use crate::database::DatabasePool;
use crate::models::medication::{MedicationLimit, NewMedicationLimit, NewUserMedication, UserMedication};

const MEDICATION_COLUMNS: &str = "id, user_id, name, dosage, notes, created_at";
const LIMIT_COLUMNS: &str = "id, user_id, medication_name, limit_count, period, is_active, created_at";

/// Repository trait for the medication list and intake limits
#[async_trait]
pub trait MedicationRepositoryTrait {
    /// List the user's medications ordered by name
    async fn list_medications(&self, user_id: &str) -> Result<Vec<UserMedication>, RepositoryError>;

    /// Add a medication; `Conflict` when the name already exists
    async fn create_medication(&self, medication: NewUserMedication) -> Result<UserMedication, RepositoryError>;

    /// Get one of the user's medications
    async fn get_medication(&self, user_id: &str, id: Uuid) -> Result<Option<UserMedication>, RepositoryError>;

    /// Persist an edited medication
    async fn update_medication(&self, medication: &UserMedication) -> Result<UserMedication, RepositoryError>;

    /// Remove a medication; false when nothing matched
    async fn delete_medication(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError>;

    /// List limits, optionally only active ones
    async fn list_limits(&self, user_id: &str, active_only: bool) -> Result<Vec<MedicationLimit>, RepositoryError>;

    /// Add a limit; `Conflict` for a duplicate medication/period pair
    async fn create_limit(&self, limit: NewMedicationLimit) -> Result<MedicationLimit, RepositoryError>;

    /// Get one of the user's limits
    async fn get_limit(&self, user_id: &str, id: Uuid) -> Result<Option<MedicationLimit>, RepositoryError>;

    /// Persist an edited limit
    async fn update_limit(&self, limit: &MedicationLimit) -> Result<MedicationLimit, RepositoryError>;

    /// Remove a limit; false when nothing matched
    async fn delete_limit(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError>;
}

/// SQLite-backed medication repository
#[derive(Debug, Clone)]
pub struct MedicationRepository {
    pool: DatabasePool,
}

impl MedicationRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn map_medication(row: &Row<'_>) -> rusqlite::Result<UserMedication> {
        Ok(UserMedication {
            id: uuid_at(row, 0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            dosage: row.get(3)?,
            notes: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn map_limit(row: &Row<'_>) -> rusqlite::Result<MedicationLimit> {
        Ok(MedicationLimit {
            id: uuid_at(row, 0)?,
            user_id: row.get(1)?,
            medication_name: row.get(2)?,
            limit_count: row.get(3)?,
            period: parsed_at(row, 4)?,
            is_active: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

#[async_trait]
impl MedicationRepositoryTrait for MedicationRepository {
    async fn list_medications(&self, user_id: &str) -> Result<Vec<UserMedication>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM user_medications WHERE user_id = ?1 ORDER BY name COLLATE NOCASE",
            MEDICATION_COLUMNS
        ))?;
        let medications = stmt
            .query_map(params![user_id], Self::map_medication)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(medications)
    }

    async fn create_medication(&self, medication: NewUserMedication) -> Result<UserMedication, RepositoryError> {
        let created = UserMedication {
            id: Uuid::new_v4(),
            user_id: medication.user_id,
            name: medication.name,
            dosage: medication.dosage,
            notes: medication.notes,
            created_at: Utc::now(),
        };

        let conn = self.pool.get()?;
        conn.execute(
            &format!("INSERT INTO user_medications ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", MEDICATION_COLUMNS),
            params![
                created.id.to_string(),
                created.user_id,
                created.name,
                created.dosage,
                created.notes,
                created.created_at,
            ],
        )?;
        Ok(created)
    }

    async fn get_medication(&self, user_id: &str, id: Uuid) -> Result<Option<UserMedication>, RepositoryError> {
        let conn = self.pool.get()?;
        let medication = conn
            .query_row(
                &format!("SELECT {} FROM user_medications WHERE id = ?1 AND user_id = ?2", MEDICATION_COLUMNS),
                params![id.to_string(), user_id],
                Self::map_medication,
            )
            .optional()?;
        Ok(medication)
    }

    async fn update_medication(&self, medication: &UserMedication) -> Result<UserMedication, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE user_medications SET name = ?3, dosage = ?4, notes = ?5 WHERE id = ?1 AND user_id = ?2",
            params![
                medication.id.to_string(),
                medication.user_id,
                medication.name,
                medication.dosage,
                medication.notes,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Medication {}", medication.id)));
        }
        Ok(medication.clone())
    }

    async fn delete_medication(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM user_medications WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id],
        )?;
        Ok(deleted > 0)
    }

    async fn list_limits(&self, user_id: &str, active_only: bool) -> Result<Vec<MedicationLimit>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM medication_limits WHERE user_id = ?1 AND (?2 = 0 OR is_active = 1)
             ORDER BY medication_name COLLATE NOCASE, period",
            LIMIT_COLUMNS
        ))?;
        let limits = stmt
            .query_map(params![user_id, active_only], Self::map_limit)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(limits)
    }

    async fn create_limit(&self, limit: NewMedicationLimit) -> Result<MedicationLimit, RepositoryError> {
        let created = MedicationLimit {
            id: Uuid::new_v4(),
            user_id: limit.user_id,
            medication_name: limit.medication_name,
            limit_count: limit.limit_count,
            period: limit.period,
            is_active: true,
            created_at: Utc::now(),
        };

        let conn = self.pool.get()?;
        conn.execute(
            &format!("INSERT INTO medication_limits ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)", LIMIT_COLUMNS),
            params![
                created.id.to_string(),
                created.user_id,
                created.medication_name,
                created.limit_count,
                created.period.as_str(),
                created.is_active,
                created.created_at,
            ],
        )?;
        Ok(created)
    }

    async fn get_limit(&self, user_id: &str, id: Uuid) -> Result<Option<MedicationLimit>, RepositoryError> {
        let conn = self.pool.get()?;
        let limit = conn
            .query_row(
                &format!("SELECT {} FROM medication_limits WHERE id = ?1 AND user_id = ?2", LIMIT_COLUMNS),
                params![id.to_string(), user_id],
                Self::map_limit,
            )
            .optional()?;
        Ok(limit)
    }

    async fn update_limit(&self, limit: &MedicationLimit) -> Result<MedicationLimit, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE medication_limits SET medication_name = ?3, limit_count = ?4, period = ?5, is_active = ?6
             WHERE id = ?1 AND user_id = ?2",
            params![
                limit.id.to_string(),
                limit.user_id,
                limit.medication_name,
                limit.limit_count,
                limit.period.as_str(),
                limit.is_active,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Medication limit {}", limit.id)));
        }
        Ok(limit.clone())
    }

    async fn delete_limit(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM medication_limits WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::medication::LimitPeriod;

    fn repo() -> MedicationRepository {
        MedicationRepository::new(DatabasePool::in_memory().unwrap())
    }

    fn new_medication(name: &str) -> NewUserMedication {
        NewUserMedication {
            user_id: "user-1".to_string(),
            name: name.to_string(),
            dosage: Some("400 mg".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_medication_names_conflict_ignoring_case() {
        let repo = repo();
        repo.create_medication(new_medication("Sumatriptan")).await.unwrap();

        let result = repo.create_medication(new_medication("sumatriptan")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));

        let listed = repo.list_medications("user-1").await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_limits_active_filter() {
        let repo = repo();
        let mut limit = repo
            .create_limit(NewMedicationLimit {
                user_id: "user-1".to_string(),
                medication_name: "Ibuprofen".to_string(),
                limit_count: 10,
                period: LimitPeriod::Month,
            })
            .await
            .unwrap();
        repo.create_limit(NewMedicationLimit {
            user_id: "user-1".to_string(),
            medication_name: "Ibuprofen".to_string(),
            limit_count: 3,
            period: LimitPeriod::Day,
        })
        .await
        .unwrap();

        limit.is_active = false;
        repo.update_limit(&limit).await.unwrap();

        assert_eq!(repo.list_limits("user-1", false).await.unwrap().len(), 2);
        let active = repo.list_limits("user-1", true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].period, LimitPeriod::Day);
    }

    #[tokio::test]
    async fn test_delete_medication_scoped_to_owner() {
        let repo = repo();
        let medication = repo.create_medication(new_medication("Naproxen")).await.unwrap();

        assert!(!repo.delete_medication("user-2", medication.id).await.unwrap());
        assert!(repo.delete_medication("user-1", medication.id).await.unwrap());
        assert!(repo.get_medication("user-1", medication.id).await.unwrap().is_none());
    }
}
