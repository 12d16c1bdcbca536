use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::errors::RepositoryError;
use super::rows::uuid_at;
use crate::database::DatabasePool;
use crate::models::weather::{NewWeatherLog, WeatherLog};

const WEATHER_COLUMNS: &str = "id, latitude, longitude, observed_at, temperature_c, pressure_hpa, \
     pressure_change_24h, humidity, precipitation_mm, wind_speed_kmh, weather_code, source, created_at";

/// Repository trait for the shared weather observation cache.
///
/// Rows are keyed by (latitude, longitude, observed_at); callers are expected
/// to round coordinates and truncate the time before looking up or inserting.
#[async_trait]
pub trait WeatherRepositoryTrait {
    async fn find(
        &self,
        latitude: f64,
        longitude: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Option<WeatherLog>, RepositoryError>;

    /// Insert an observation, or return the row that already holds its key
    async fn insert(&self, log: NewWeatherLog) -> Result<WeatherLog, RepositoryError>;

    async fn get(&self, id: Uuid) -> Result<Option<WeatherLog>, RepositoryError>;

    /// Fetch several observations at once; unknown ids are skipped
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<WeatherLog>, RepositoryError>;
}

/// SQLite-backed weather cache
#[derive(Debug, Clone)]
pub struct WeatherRepository {
    pool: DatabasePool,
}

impl WeatherRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<WeatherLog> {
        Ok(WeatherLog {
            id: uuid_at(row, 0)?,
            latitude: row.get(1)?,
            longitude: row.get(2)?,
            observed_at: row.get(3)?,
            temperature_c: row.get(4)?,
            pressure_hpa: row.get(5)?,
            pressure_change_24h: row.get(6)?,
            humidity: row.get(7)?,
            precipitation_mm: row.get(8)?,
            wind_speed_kmh: row.get(9)?,
            weather_code: row.get(10)?,
            source: row.get(11)?,
            created_at: row.get(12)?,
        })
    }
}

#[async_trait]
impl WeatherRepositoryTrait for WeatherRepository {
    async fn find(
        &self,
        latitude: f64,
        longitude: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Option<WeatherLog>, RepositoryError> {
        let conn = self.pool.get()?;
        let log = conn
            .query_row(
                &format!(
                    "SELECT {} FROM weather_logs WHERE latitude = ?1 AND longitude = ?2 AND observed_at = ?3",
                    WEATHER_COLUMNS
                ),
                params![latitude, longitude, observed_at],
                Self::map_row,
            )
            .optional()?;
        Ok(log)
    }

    async fn insert(&self, log: NewWeatherLog) -> Result<WeatherLog, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO weather_logs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                WEATHER_COLUMNS
            ),
            params![
                Uuid::new_v4().to_string(),
                log.latitude,
                log.longitude,
                log.observed_at,
                log.temperature_c,
                log.pressure_hpa,
                log.pressure_change_24h,
                log.humidity,
                log.precipitation_mm,
                log.wind_speed_kmh,
                log.weather_code,
                log.source,
                Utc::now(),
            ],
        )?;

        // Either our row or the one a concurrent writer stored first
        let stored = conn.query_row(
            &format!(
                "SELECT {} FROM weather_logs WHERE latitude = ?1 AND longitude = ?2 AND observed_at = ?3",
                WEATHER_COLUMNS
            ),
            params![log.latitude, log.longitude, log.observed_at],
            Self::map_row,
        )?;
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<Option<WeatherLog>, RepositoryError> {
        let conn = self.pool.get()?;
        let log = conn
            .query_row(
                &format!("SELECT {} FROM weather_logs WHERE id = ?1", WEATHER_COLUMNS),
                params![id.to_string()],
                Self::map_row,
            )
            .optional()?;
        Ok(log)
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<WeatherLog>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM weather_logs WHERE id = ?1", WEATHER_COLUMNS))?;
        let mut logs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(log) = stmt.query_row(params![id.to_string()], Self::map_row).optional()? {
                logs.push(log);
            }
        }
        Ok(logs)
    }
}
