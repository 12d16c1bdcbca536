//! Open-Meteo weather client
//!
//! Historical observations come from two endpoints: the forecast API keeps
//! roughly three months of history, the archive API everything older but with
//! a few days of lag. Each lookup tries the endpoint most likely to have the
//! hour and falls back to the other one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::WeatherConfig;
use migraine_diary_data::models::NewWeatherLog;

/// How far back the forecast endpoint serves hourly history
pub const FORECAST_HISTORY_DAYS: i64 = 92;

const HOURLY_FIELDS: &str =
    "temperature_2m,surface_pressure,relative_humidity_2m,precipitation,wind_speed_10m,weather_code";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Weather API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// The provider answered but had no value for the requested hour
    #[error("No weather data: {0}")]
    NoData(String),
}

/// Upstream endpoint an observation was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherSource {
    Forecast,
    Archive,
}

impl WeatherSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherSource::Forecast => "open-meteo-forecast",
            WeatherSource::Archive => "open-meteo-archive",
        }
    }

    /// Endpoints to try for an observation at `at`, in order
    pub fn fallback_chain(at: DateTime<Utc>, now: DateTime<Utc>) -> [WeatherSource; 2] {
        if now - at <= ChronoDuration::days(FORECAST_HISTORY_DAYS) {
            [WeatherSource::Forecast, WeatherSource::Archive]
        } else {
            [WeatherSource::Archive, WeatherSource::Forecast]
        }
    }
}

/// Source of hourly weather observations
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Observation for the hour nearest to `at`
    async fn observation(&self, latitude: f64, longitude: f64, at: DateTime<Utc>)
        -> Result<NewWeatherLog, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: Option<HourlySeries>,
}

#[derive(Debug, Default, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    surface_pressure: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
}

fn value_at<T: Copy>(series: &[Option<T>], index: usize) -> Option<T> {
    series.get(index).copied().flatten()
}

impl HourlySeries {
    fn times(&self) -> Result<Vec<DateTime<Utc>>, WeatherError> {
        self.time
            .iter()
            .map(|raw| {
                NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
                    .map(|naive| naive.and_utc())
                    .map_err(|e| WeatherError::Parse(format!("invalid time {:?}: {}", raw, e)))
            })
            .collect()
    }

    /// Pick the hour closest to `at` and derive the 24 hour pressure change
    fn observation_at(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
        source: WeatherSource,
    ) -> Result<NewWeatherLog, WeatherError> {
        let times = self.times()?;
        let (index, observed_at) = times
            .iter()
            .enumerate()
            .min_by_key(|(_, time)| (**time - at).num_seconds().abs())
            .map(|(index, time)| (index, *time))
            .ok_or_else(|| WeatherError::NoData(format!("empty hourly series for {}", at)))?;

        let pressure = value_at(&self.surface_pressure, index);
        let temperature = value_at(&self.temperature_2m, index);
        if pressure.is_none() && temperature.is_none() {
            return Err(WeatherError::NoData(format!("no values for {}", observed_at)));
        }

        let day_before = observed_at - ChronoDuration::hours(24);
        let pressure_change_24h = times
            .iter()
            .position(|time| *time == day_before)
            .and_then(|prev| value_at(&self.surface_pressure, prev))
            .zip(pressure)
            .map(|(before, now)| now - before);

        Ok(NewWeatherLog {
            latitude,
            longitude,
            observed_at,
            temperature_c: temperature,
            pressure_hpa: pressure,
            pressure_change_24h,
            humidity: value_at(&self.relative_humidity_2m, index),
            precipitation_mm: value_at(&self.precipitation, index),
            wind_speed_kmh: value_at(&self.wind_speed_10m, index),
            weather_code: value_at(&self.weather_code, index),
            source: source.as_str().to_string(),
        })
    }
}

/// Weather provider backed by the Open-Meteo forecast and archive APIs
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    client: Arc<Client>,
    forecast_url: String,
    archive_url: String,
}

impl OpenMeteoProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client: Arc::new(client),
            forecast_url: config.forecast_url.clone(),
            archive_url: config.archive_url.clone(),
        })
    }

    fn url_for(&self, source: WeatherSource) -> &str {
        match source {
            WeatherSource::Forecast => &self.forecast_url,
            WeatherSource::Archive => &self.archive_url,
        }
    }

    async fn fetch(
        &self,
        source: WeatherSource,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<NewWeatherLog, WeatherError> {
        let start_date = (at - ChronoDuration::days(1)).date_naive().to_string();
        let end_date = at.date_naive().to_string();

        let response = self
            .client
            .get(self.url_for(source))
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("timezone", "UTC".to_string()),
                ("start_date", start_date),
                ("end_date", end_date),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        payload
            .hourly
            .unwrap_or_default()
            .observation_at(latitude, longitude, at, source)
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn observation(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<NewWeatherLog, WeatherError> {
        let mut last_error = None;

        for source in WeatherSource::fallback_chain(at, Utc::now()) {
            match self.fetch(source, latitude, longitude, at).await {
                Ok(log) => {
                    debug!("Weather for ({}, {}) at {} from {}", latitude, longitude, at, source.as_str());
                    return Ok(log);
                }
                Err(e) => {
                    warn!("Weather lookup via {} failed: {}", source.as_str(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| WeatherError::NoData(format!("no source for {}", at))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hourly_body(start: DateTime<Utc>, hours: i64, pressure: impl Fn(i64) -> f64) -> serde_json::Value {
        let times: Vec<String> = (0..hours)
            .map(|h| (start + ChronoDuration::hours(h)).format(TIME_FORMAT).to_string())
            .collect();
        let pressures: Vec<f64> = (0..hours).map(&pressure).collect();
        let temperatures: Vec<f64> = (0..hours).map(|h| 10.0 + h as f64 * 0.1).collect();
        serde_json::json!({
            "hourly": {
                "time": times,
                "temperature_2m": temperatures,
                "surface_pressure": pressures,
                "relative_humidity_2m": vec![80.0; hours as usize],
                "precipitation": vec![0.0; hours as usize],
                "wind_speed_10m": vec![12.5; hours as usize],
                "weather_code": vec![3; hours as usize]
            }
        })
    }

    fn provider_for(server: &MockServer) -> OpenMeteoProvider {
        let config = WeatherConfig {
            forecast_url: format!("{}/v1/forecast", server.uri()),
            archive_url: format!("{}/v1/archive", server.uri()),
            ..WeatherConfig::default()
        };
        OpenMeteoProvider::new(&config).unwrap()
    }

    #[test]
    fn test_fallback_chain_depends_on_age() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            WeatherSource::fallback_chain(now - ChronoDuration::days(10), now),
            [WeatherSource::Forecast, WeatherSource::Archive]
        );
        assert_eq!(
            WeatherSource::fallback_chain(now - ChronoDuration::days(92), now),
            [WeatherSource::Forecast, WeatherSource::Archive]
        );
        assert_eq!(
            WeatherSource::fallback_chain(now - ChronoDuration::days(93), now),
            [WeatherSource::Archive, WeatherSource::Forecast]
        );
    }

    #[test]
    fn test_observation_picks_nearest_hour_and_pressure_change() {
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        let body = hourly_body(start, 48, |h| 1000.0 + h as f64);
        let series: ForecastResponse = serde_json::from_value(body).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 14, 20, 0).unwrap();

        let log = series
            .hourly
            .unwrap()
            .observation_at(48.1, 11.6, at, WeatherSource::Forecast)
            .unwrap();

        assert_eq!(log.observed_at, Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap());
        assert_eq!(log.pressure_hpa, Some(1038.0));
        assert_eq!(log.pressure_change_24h, Some(24.0));
        assert_eq!(log.weather_code, Some(3));
        assert_eq!(log.source, "open-meteo-forecast");
    }

    #[test]
    fn test_missing_previous_day_leaves_change_empty() {
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let series: ForecastResponse = serde_json::from_value(hourly_body(start, 6, |_| 1012.0)).unwrap();

        let log = series
            .hourly
            .unwrap()
            .observation_at(0.0, 0.0, start + ChronoDuration::hours(3), WeatherSource::Archive)
            .unwrap();
        assert_eq!(log.pressure_change_24h, None);
    }

    #[test]
    fn test_empty_series_is_no_data() {
        let result = HourlySeries::default().observation_at(0.0, 0.0, Utc::now(), WeatherSource::Forecast);
        assert!(matches!(result, Err(WeatherError::NoData(_))));
    }

    #[tokio::test]
    async fn test_recent_lookup_uses_forecast_endpoint() {
        let server = MockServer::start().await;
        let at = Utc::now() - ChronoDuration::days(2);
        let start = (at - ChronoDuration::days(1)).date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("timezone", "UTC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hourly_body(start, 48, |_| 1015.0)))
            .expect(1)
            .mount(&server)
            .await;

        let log = provider_for(&server).observation(52.52, 13.41, at).await.unwrap();
        assert_eq!(log.source, "open-meteo-forecast");
        assert_eq!(log.pressure_hpa, Some(1015.0));
    }

    #[tokio::test]
    async fn test_falls_back_to_archive_when_forecast_fails() {
        let server = MockServer::start().await;
        let at = Utc::now() - ChronoDuration::days(5);
        let start = (at - ChronoDuration::days(1)).date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hourly_body(start, 48, |_| 1009.0)))
            .mount(&server)
            .await;

        let log = provider_for(&server).observation(52.52, 13.41, at).await.unwrap();
        assert_eq!(log.source, "open-meteo-archive");
    }

    #[tokio::test]
    async fn test_both_sources_failing_returns_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = provider_for(&server).observation(1.0, 2.0, Utc::now()).await;
        assert!(matches!(result, Err(WeatherError::Status { status: 503, .. })));
    }
}
