use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::errors::RepositoryError;
use super::rows::{json_at, opt_uuid_at, uuid_at};
use crate::database::DatabasePool;
use crate::models::entry::{EntryFilter, NewPainEntry, PainEntry};

const ENTRY_COLUMNS: &str = "id, user_id, timestamp, pain_level, pain_location, aura_type, triggers, \
     medications, me_cfs_severity, notes, latitude, longitude, weather_id, created_at, updated_at";

/// Failed weather lookups after which an entry leaves the backfill queue
pub const MAX_WEATHER_ATTEMPTS: u32 = 5;

/// Hours a failed weather lookup waits before it is retried
pub const WEATHER_RETRY_COOLDOWN_HOURS: i64 = 6;

/// Repository trait for pain entries
#[async_trait]
pub trait EntryRepositoryTrait {
    /// Insert a new entry
    async fn create(&self, entry: NewPainEntry) -> Result<PainEntry, RepositoryError>;

    /// Get one of the user's entries
    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<PainEntry>, RepositoryError>;

    /// List the user's entries; returns the page and the total match count
    async fn list(&self, user_id: &str, filter: &EntryFilter) -> Result<(Vec<PainEntry>, usize), RepositoryError>;

    /// Persist an edited entry
    async fn update(&self, entry: &PainEntry) -> Result<PainEntry, RepositoryError>;

    /// Delete one of the user's entries; false when nothing matched
    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError>;

    /// Entries with coordinates but no linked weather observation.
    ///
    /// Entries never attempted come first, oldest first. Entries whose last
    /// failure is inside the cooldown, or that used up their attempts, are left out.
    async fn missing_weather(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<PainEntry>, RepositoryError>;

    /// Count a failed weather lookup against an entry
    async fn record_weather_failure(&self, entry_id: Uuid) -> Result<(), RepositoryError>;

    /// Link an observation to an entry that has none yet; false when already linked
    async fn set_weather(&self, entry_id: Uuid, weather_id: Uuid) -> Result<bool, RepositoryError>;
}

/// SQLite-backed entry repository
#[derive(Debug, Clone)]
pub struct EntryRepository {
    pool: DatabasePool,
}

impl EntryRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<PainEntry> {
        Ok(PainEntry {
            id: uuid_at(row, 0)?,
            user_id: row.get(1)?,
            timestamp: row.get(2)?,
            pain_level: row.get(3)?,
            pain_location: row.get(4)?,
            aura_type: row.get(5)?,
            triggers: json_at(row, 6)?,
            medications: json_at(row, 7)?,
            me_cfs_severity: row.get(8)?,
            notes: row.get(9)?,
            latitude: row.get(10)?,
            longitude: row.get(11)?,
            weather_id: opt_uuid_at(row, 12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }
}

#[async_trait]
impl EntryRepositoryTrait for EntryRepository {
    async fn create(&self, entry: NewPainEntry) -> Result<PainEntry, RepositoryError> {
        let now = Utc::now();
        let created = PainEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            timestamp: entry.timestamp,
            pain_level: entry.pain_level,
            pain_location: entry.pain_location,
            aura_type: entry.aura_type,
            triggers: entry.triggers,
            medications: entry.medications,
            me_cfs_severity: entry.me_cfs_severity,
            notes: entry.notes,
            latitude: entry.latitude,
            longitude: entry.longitude,
            weather_id: None,
            created_at: now,
            updated_at: now,
        };

        debug!("Storing pain entry in database: id={}", created.id);
        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO pain_entries ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                ENTRY_COLUMNS
            ),
            params![
                created.id.to_string(),
                created.user_id,
                created.timestamp,
                created.pain_level,
                created.pain_location,
                created.aura_type,
                serde_json::to_string(&created.triggers)?,
                serde_json::to_string(&created.medications)?,
                created.me_cfs_severity,
                created.notes,
                created.latitude,
                created.longitude,
                Option::<String>::None,
                created.created_at,
                created.updated_at,
            ],
        )?;

        Ok(created)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<PainEntry>, RepositoryError> {
        let conn = self.pool.get()?;
        let entry = conn
            .query_row(
                &format!("SELECT {} FROM pain_entries WHERE id = ?1 AND user_id = ?2", ENTRY_COLUMNS),
                params![id.to_string(), user_id],
                Self::map_row,
            )
            .optional()?;
        Ok(entry)
    }

    async fn list(&self, user_id: &str, filter: &EntryFilter) -> Result<(Vec<PainEntry>, usize), RepositoryError> {
        debug!("Listing pain entries for user {} with {:?}", user_id, filter);
        let conn = self.pool.get()?;

        let where_clause = "user_id = ?1 AND (?2 IS NULL OR timestamp >= ?2) AND (?3 IS NULL OR timestamp <= ?3)
             AND (?4 IS NULL OR timestamp < ?4)";

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM pain_entries WHERE {}", where_clause),
            params![user_id, filter.from, filter.to, filter.before],
            |row| row.get(0),
        )?;

        let direction = if filter.sort_desc { "DESC" } else { "ASC" };
        // SQLite treats a negative LIMIT as "no limit"
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let offset = filter.offset.unwrap_or(0) as i64;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pain_entries WHERE {} ORDER BY timestamp {}, id {} LIMIT ?5 OFFSET ?6",
            ENTRY_COLUMNS, where_clause, direction, direction
        ))?;
        let entries = stmt
            .query_map(
                params![user_id, filter.from, filter.to, filter.before, limit, offset],
                Self::map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((entries, total as usize))
    }

    async fn update(&self, entry: &PainEntry) -> Result<PainEntry, RepositoryError> {
        let mut updated = entry.clone();
        updated.updated_at = Utc::now();

        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE pain_entries SET timestamp = ?3, pain_level = ?4, pain_location = ?5, aura_type = ?6,
                 triggers = ?7, medications = ?8, me_cfs_severity = ?9, notes = ?10, latitude = ?11,
                 longitude = ?12, weather_id = ?13, updated_at = ?14
             WHERE id = ?1 AND user_id = ?2",
            params![
                updated.id.to_string(),
                updated.user_id,
                updated.timestamp,
                updated.pain_level,
                updated.pain_location,
                updated.aura_type,
                serde_json::to_string(&updated.triggers)?,
                serde_json::to_string(&updated.medications)?,
                updated.me_cfs_severity,
                updated.notes,
                updated.latitude,
                updated.longitude,
                updated.weather_id.map(|id| id.to_string()),
                updated.updated_at,
            ],
        )?;

        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Pain entry {}", entry.id)));
        }
        Ok(updated)
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM pain_entries WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id],
        )?;
        Ok(deleted > 0)
    }

    async fn missing_weather(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<PainEntry>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pain_entries
             WHERE weather_id IS NULL AND latitude IS NOT NULL AND longitude IS NOT NULL
               AND (?1 IS NULL OR user_id = ?1)
               AND weather_attempts < ?3
               AND (weather_attempted_at IS NULL OR weather_attempted_at <= ?4)
             ORDER BY weather_attempts ASC, timestamp ASC LIMIT ?2",
            ENTRY_COLUMNS
        ))?;
        let retry_before = Utc::now() - Duration::hours(WEATHER_RETRY_COOLDOWN_HOURS);
        let entries = stmt
            .query_map(
                params![user_id, limit as i64, MAX_WEATHER_ATTEMPTS, retry_before],
                Self::map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn record_weather_failure(&self, entry_id: Uuid) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE pain_entries SET weather_attempts = weather_attempts + 1, weather_attempted_at = ?2
             WHERE id = ?1",
            params![entry_id.to_string(), Utc::now()],
        )?;
        if changed == 0 {
            debug!("Weather failure recorded for missing entry {}", entry_id);
        }
        Ok(())
    }

    async fn set_weather(&self, entry_id: Uuid, weather_id: Uuid) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE pain_entries SET weather_id = ?2, updated_at = ?3 WHERE id = ?1 AND weather_id IS NULL",
            params![entry_id.to_string(), weather_id.to_string(), Utc::now()],
        )?;
        Ok(changed > 0)
    }
}
