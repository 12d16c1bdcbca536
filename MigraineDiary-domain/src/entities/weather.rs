use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

pub use migraine_diary_data::models::weather::{NewWeatherLog, WeatherLog};

/// Outcome of one backfill run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct BackfillReport {
    /// Entries selected for this batch
    pub selected: usize,
    /// Entries linked to an observation
    pub processed: usize,
    /// Entries whose observation could not be fetched
    pub failed: usize,
}
