use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Cached hourly weather observation for a rounded location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct WeatherLog {
    pub id: Uuid,
    /// Latitude rounded to two decimals
    pub latitude: f64,
    /// Longitude rounded to two decimals
    pub longitude: f64,
    /// Start of the observed hour
    pub observed_at: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub pressure_hpa: Option<f64>,
    /// Surface pressure now minus 24 hours earlier
    pub pressure_change_24h: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    /// WMO weather interpretation code
    pub weather_code: Option<i32>,
    /// Which upstream endpoint produced the observation
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// Input data for caching an observation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewWeatherLog {
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub pressure_change_24h: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub weather_code: Option<i32>,
    pub source: String,
}
