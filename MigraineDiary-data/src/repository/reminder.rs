use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::errors::RepositoryError;
use super::rows::{parsed_at, uuid_at};
use crate::database::DatabasePool;
use crate::models::reminder::{NewReminder, Reminder, ReminderStatus};

const REMINDER_COLUMNS: &str = "id, user_id, kind, title, body, medication_name, date_time, repeat, status, \
     last_sent_at, created_at, updated_at";

/// Repository trait for reminders and their delivery state machine.
///
/// Status moves `pending -> processing` only through [`claim`](Self::claim),
/// which is a conditional update so concurrent processors never deliver the
/// same row twice.
#[async_trait]
pub trait ReminderRepositoryTrait {
    async fn create(&self, reminder: NewReminder) -> Result<Reminder, RepositoryError>;

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Reminder>, RepositoryError>;

    /// List a user's reminders ordered by next fire time
    async fn list(&self, user_id: &str, status: Option<ReminderStatus>) -> Result<Vec<Reminder>, RepositoryError>;

    /// Persist user-editable fields and status
    async fn update(&self, reminder: &Reminder) -> Result<Reminder, RepositoryError>;

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError>;

    /// Pending reminders firing at or before `until`
    async fn due(&self, until: DateTime<Utc>) -> Result<Vec<Reminder>, RepositoryError>;

    /// Move a pending reminder to processing; false if someone else got it first
    async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, RepositoryError>;

    /// Finish a one-shot reminder
    async fn complete(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Put a repeating reminder back to pending at its next occurrence
    async fn reschedule(&self, id: Uuid, next: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Hand a claimed reminder back without delivering it
    async fn release(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Return processing rows claimed before `older_than` to pending
    async fn release_stale(&self, older_than: DateTime<Utc>) -> Result<usize, RepositoryError>;
}

/// SQLite-backed reminder repository
#[derive(Debug, Clone)]
pub struct ReminderRepository {
    pool: DatabasePool,
}

impl ReminderRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
        Ok(Reminder {
            id: uuid_at(row, 0)?,
            user_id: row.get(1)?,
            kind: parsed_at(row, 2)?,
            title: row.get(3)?,
            body: row.get(4)?,
            medication_name: row.get(5)?,
            date_time: row.get(6)?,
            repeat: parsed_at(row, 7)?,
            status: parsed_at(row, 8)?,
            last_sent_at: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

#[async_trait]
impl ReminderRepositoryTrait for ReminderRepository {
    async fn create(&self, reminder: NewReminder) -> Result<Reminder, RepositoryError> {
        let now = Utc::now();
        let created = Reminder {
            id: Uuid::new_v4(),
            user_id: reminder.user_id,
            kind: reminder.kind,
            title: reminder.title,
            body: reminder.body,
            medication_name: reminder.medication_name,
            date_time: reminder.date_time,
            repeat: reminder.repeat,
            status: ReminderStatus::Pending,
            last_sent_at: None,
            created_at: now,
            updated_at: now,
        };

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO reminders ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                REMINDER_COLUMNS
            ),
            params![
                created.id.to_string(),
                created.user_id,
                created.kind.as_str(),
                created.title,
                created.body,
                created.medication_name,
                created.date_time,
                created.repeat.as_str(),
                created.status.as_str(),
                created.last_sent_at,
                created.created_at,
                created.updated_at,
            ],
        )?;
        Ok(created)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Reminder>, RepositoryError> {
        let conn = self.pool.get()?;
        let reminder = conn
            .query_row(
                &format!("SELECT {} FROM reminders WHERE id = ?1 AND user_id = ?2", REMINDER_COLUMNS),
                params![id.to_string(), user_id],
                Self::map_row,
            )
            .optional()?;
        Ok(reminder)
    }

    async fn list(&self, user_id: &str, status: Option<ReminderStatus>) -> Result<Vec<Reminder>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reminders WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY date_time ASC, id ASC",
            REMINDER_COLUMNS
        ))?;
        let reminders = stmt
            .query_map(params![user_id, status.map(|s| s.as_str())], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reminders)
    }

    async fn update(&self, reminder: &Reminder) -> Result<Reminder, RepositoryError> {
        let mut updated = reminder.clone();
        updated.updated_at = Utc::now();

        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE reminders SET kind = ?3, title = ?4, body = ?5, medication_name = ?6, date_time = ?7,
                 repeat = ?8, status = ?9, updated_at = ?10
             WHERE id = ?1 AND user_id = ?2",
            params![
                updated.id.to_string(),
                updated.user_id,
                updated.kind.as_str(),
                updated.title,
                updated.body,
                updated.medication_name,
                updated.date_time,
                updated.repeat.as_str(),
                updated.status.as_str(),
                updated.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Reminder {}", reminder.id)));
        }
        Ok(updated)
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM reminders WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id],
        )?;
        Ok(deleted > 0)
    }

    async fn due(&self, until: DateTime<Utc>) -> Result<Vec<Reminder>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reminders WHERE status = 'pending' AND date_time <= ?1 ORDER BY date_time ASC",
            REMINDER_COLUMNS
        ))?;
        let reminders = stmt
            .query_map(params![until], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reminders)
    }

    async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE reminders SET status = 'processing', updated_at = ?2 WHERE id = ?1 AND status = 'pending'",
            params![id.to_string(), now],
        )?;
        Ok(changed == 1)
    }

    async fn complete(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE reminders SET status = 'completed', last_sent_at = ?2, updated_at = ?2 WHERE id = ?1",
            params![id.to_string(), now],
        )?;
        Ok(())
    }

    async fn reschedule(&self, id: Uuid, next: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE reminders SET status = 'pending', date_time = ?2, last_sent_at = ?3, updated_at = ?3
             WHERE id = ?1",
            params![id.to_string(), next, now],
        )?;
        Ok(())
    }

    async fn release(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE reminders SET status = 'pending', updated_at = ?2 WHERE id = ?1 AND status = 'processing'",
            params![id.to_string(), now],
        )?;
        Ok(())
    }

    async fn release_stale(&self, older_than: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let conn = self.pool.get()?;
        let released = conn.execute(
            "UPDATE reminders SET status = 'pending' WHERE status = 'processing' AND updated_at < ?1",
            params![older_than],
        )?;
        Ok(released)
    }
}
