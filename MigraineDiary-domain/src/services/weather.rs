use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, DurationRound, Utc};
use tracing::{debug, error, info, instrument};

use crate::clients::weather::WeatherProvider;
use crate::entities::weather::{BackfillReport, WeatherLog};
use crate::services::error::ServiceError;
use migraine_diary_data::repository::{EntryRepositoryTrait, WeatherRepositoryTrait};

/// Round a coordinate to the cache grid (two decimals, about 1 km)
pub fn round_coordinate(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Truncate a timestamp to the start of its hour
pub fn truncate_to_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(chrono::Duration::hours(1)).unwrap_or(at)
}

/// Cached weather lookups and the backfill job
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    weather: Arc<dyn WeatherRepositoryTrait + Send + Sync>,
    entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
    batch_size: usize,
    request_delay: Duration,
}

impl WeatherService {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        weather: Arc<dyn WeatherRepositoryTrait + Send + Sync>,
        entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
        batch_size: usize,
        request_delay: Duration,
    ) -> Self {
        Self {
            provider,
            weather,
            entries,
            batch_size,
            request_delay,
        }
    }

    /// Cached observation for a place and time, fetched upstream on a miss
    #[instrument(skip(self))]
    pub async fn observation_for(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<(WeatherLog, bool), ServiceError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ServiceError::Validation("Coordinates out of range".to_string()));
        }

        let latitude = round_coordinate(latitude);
        let longitude = round_coordinate(longitude);
        let hour = truncate_to_hour(at);

        if let Some(cached) = self.weather.find(latitude, longitude, hour).await? {
            debug!("Weather cache hit for ({}, {}) at {}", latitude, longitude, hour);
            return Ok((cached, true));
        }

        let mut observation = self.provider.observation(latitude, longitude, hour).await?;
        // Store under the lookup key, whatever hour the provider matched
        observation.latitude = latitude;
        observation.longitude = longitude;
        observation.observed_at = hour;

        let stored = self.weather.insert(observation).await?;
        Ok((stored, false))
    }

    pub async fn get_many(&self, ids: &[uuid::Uuid]) -> Result<Vec<WeatherLog>, ServiceError> {
        Ok(self.weather.get_many(ids).await?)
    }

    /// Link weather observations to entries that have coordinates but no weather
    ///
    /// Selects one batch, processes it sequentially with a pause between
    /// upstream calls, and keeps going when a single lookup fails. Failed
    /// entries are recorded so later runs move on to newer ones.
    #[instrument(skip(self))]
    pub async fn backfill(&self, user_id: Option<&str>) -> Result<BackfillReport, ServiceError> {
        let entries = self.entries.missing_weather(user_id, self.batch_size).await?;
        let mut report = BackfillReport {
            selected: entries.len(),
            ..BackfillReport::default()
        };

        for (index, entry) in entries.iter().enumerate() {
            let Some((latitude, longitude)) = entry.coordinates() else {
                continue;
            };

            match self.observation_for(latitude, longitude, entry.timestamp).await {
                Ok((log, cached)) => {
                    self.entries.set_weather(entry.id, log.id).await?;
                    report.processed += 1;
                    if cached {
                        continue;
                    }
                }
                Err(e) => {
                    error!("Weather backfill failed for entry {}: {}", entry.id, e);
                    self.entries.record_weather_failure(entry.id).await?;
                    report.failed += 1;
                }
            }

            if index + 1 < entries.len() && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        info!(
            selected = report.selected,
            processed = report.processed,
            failed = report.failed,
            "Weather backfill finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWeatherProvider;
    use chrono::TimeZone;
    use migraine_diary_data::database::DatabasePool;
    use migraine_diary_data::models::NewPainEntry;
    use migraine_diary_data::repository::{EntryRepository, WeatherRepository};

    fn setup(provider: Arc<FakeWeatherProvider>) -> (WeatherService, Arc<EntryRepository>) {
        setup_with_batch(provider, 10)
    }

    fn setup_with_batch(provider: Arc<FakeWeatherProvider>, batch_size: usize) -> (WeatherService, Arc<EntryRepository>) {
        let pool = DatabasePool::in_memory().unwrap();
        let entries = Arc::new(EntryRepository::new(pool.clone()));
        let service = WeatherService::new(
            provider,
            Arc::new(WeatherRepository::new(pool)),
            entries.clone(),
            batch_size,
            Duration::ZERO,
        );
        (service, entries)
    }

    fn entry(latitude: Option<f64>, longitude: Option<f64>, timestamp: DateTime<Utc>) -> NewPainEntry {
        NewPainEntry {
            user_id: "user-1".to_string(),
            timestamp,
            pain_level: 6,
            pain_location: None,
            aura_type: None,
            triggers: vec![],
            medications: vec![],
            me_cfs_severity: None,
            notes: None,
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_rounding_and_truncation() {
        assert_eq!(round_coordinate(52.51987), 52.52);
        assert_eq!(round_coordinate(-13.4071), -13.41);
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 14, 59, 59).unwrap();
        assert_eq!(truncate_to_hour(at), Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_observation_is_cached_per_rounded_key() {
        let provider = Arc::new(FakeWeatherProvider::new());
        let (service, _) = setup(provider.clone());
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 14, 20, 0).unwrap();

        let (first, cached) = service.observation_for(52.5201, 13.4049, at).await.unwrap();
        assert!(!cached);
        assert_eq!(first.latitude, 52.52);
        assert_eq!(first.observed_at, Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap());

        let (second, cached) = service.observation_for(52.5199, 13.4012, at + chrono::Duration::minutes(30)).await.unwrap();
        assert!(cached);
        assert_eq!(second.id, first.id);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_backfill_links_entries_and_is_idempotent() {
        let provider = Arc::new(FakeWeatherProvider::new());
        let (service, entries) = setup(provider.clone());
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap();

        entries.create(entry(Some(48.14), Some(11.58), at)).await.unwrap();
        entries.create(entry(Some(48.14), Some(11.58), at + chrono::Duration::hours(5))).await.unwrap();
        entries.create(entry(None, None, at)).await.unwrap();

        let report = service.backfill(Some("user-1")).await.unwrap();
        assert_eq!(report, BackfillReport { selected: 2, processed: 2, failed: 0 });
        assert_eq!(provider.calls(), 2);

        let report = service.backfill(Some("user-1")).await.unwrap();
        assert_eq!(report, BackfillReport::default());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_backfill_counts_failures_and_continues() {
        let provider = Arc::new(FakeWeatherProvider::failing());
        let (service, entries) = setup(provider);
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap();

        entries.create(entry(Some(1.0), Some(2.0), at)).await.unwrap();
        entries.create(entry(Some(3.0), Some(4.0), at)).await.unwrap();

        let report = service.backfill(None).await.unwrap();
        assert_eq!(report.selected, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.processed, 0);
    }

    #[tokio::test]
    async fn test_failing_oldest_entries_do_not_block_newer_ones() {
        let provider = Arc::new(FakeWeatherProvider::failing_at(&[1.0, 3.0]));
        let (service, entries) = setup_with_batch(provider.clone(), 2);
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap();

        entries.create(entry(Some(1.0), Some(2.0), at)).await.unwrap();
        entries.create(entry(Some(3.0), Some(4.0), at + chrono::Duration::hours(1))).await.unwrap();
        let good = entries
            .create(entry(Some(48.14), Some(11.58), at + chrono::Duration::hours(2)))
            .await
            .unwrap();

        let report = service.backfill(None).await.unwrap();
        assert_eq!(report, BackfillReport { selected: 2, processed: 0, failed: 2 });

        let report = service.backfill(None).await.unwrap();
        assert_eq!(report, BackfillReport { selected: 1, processed: 1, failed: 0 });
        let linked = entries.get("user-1", good.id).await.unwrap().unwrap();
        assert!(linked.weather_id.is_some());

        // Failed entries wait out their cooldown instead of hitting the provider again
        let report = service.backfill(None).await.unwrap();
        assert_eq!(report, BackfillReport::default());
        assert_eq!(provider.calls(), 3);
    }
}
