use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Sample-size classification controlling whether a statistic is shown
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SampleTier {
    /// Fewer than 3 samples; averages are withheld
    Insufficient,
    /// 3 to 9 samples
    Preliminary,
    /// 10 samples or more
    Reliable,
}

impl SampleTier {
    pub fn for_count(count: usize) -> Self {
        match count {
            0..=2 => SampleTier::Insufficient,
            3..=9 => SampleTier::Preliminary,
            _ => SampleTier::Reliable,
        }
    }

    pub fn is_sufficient(&self) -> bool {
        *self != SampleTier::Insufficient
    }
}

/// Name with an occurrence count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CountItem {
    pub name: String,
    pub count: usize,
}

/// Pain aggregated by day of week
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct WeekdayPain {
    /// English weekday name, Monday first
    pub weekday: String,
    pub count: usize,
    pub avg_pain: Option<f64>,
}

/// Direction of the 24-hour surface pressure change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PressureTrend {
    /// Dropped by more than 3 hPa
    Falling,
    Stable,
    /// Rose by more than 3 hPa
    Rising,
}

impl PressureTrend {
    pub fn from_change(change_hpa: f64) -> Self {
        if change_hpa < -3.0 {
            PressureTrend::Falling
        } else if change_hpa > 3.0 {
            PressureTrend::Rising
        } else {
            PressureTrend::Stable
        }
    }
}

/// Pain statistics for one pressure trend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PressureBucket {
    pub trend: PressureTrend,
    pub count: usize,
    pub avg_pain: Option<f64>,
    pub tier: SampleTier,
}

/// Pain grouped by pressure trend for entries with linked weather
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct WeatherCorrelation {
    /// Entries with a known pressure change
    pub sample_size: usize,
    pub tier: SampleTier,
    pub buckets: Vec<PressureBucket>,
}

/// ME/CFS severity distribution
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct SeverityDistribution {
    /// Severity 0
    pub none: usize,
    /// Severity 1-3
    pub mild: usize,
    /// Severity 4-6
    pub moderate: usize,
    /// Severity 7-10
    pub severe: usize,
}

/// ME/CFS burden over the range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct MeCfsSummary {
    /// Entries carrying a severity
    pub sample_size: usize,
    pub avg_severity: Option<f64>,
    /// Distinct days with a severity recorded
    pub days_recorded: usize,
    pub distribution: SeverityDistribution,
    pub tier: SampleTier,
}

/// Aggregates over a user's entries in a date range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct EntryStatistics {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub entry_count: usize,
    /// Distinct days with pain above zero
    pub pain_days: usize,
    pub avg_pain: Option<f64>,
    pub max_pain: Option<u8>,
    /// Distinct days with at least one medication intake
    pub medication_days: usize,
    pub tier: SampleTier,
    pub top_triggers: Vec<CountItem>,
    pub top_medications: Vec<CountItem>,
    pub pain_by_weekday: Vec<WeekdayPain>,
    pub weather: WeatherCorrelation,
    pub me_cfs: MeCfsSummary,
}

/// Date range for statistics and reports
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(SampleTier::for_count(0), SampleTier::Insufficient);
        assert_eq!(SampleTier::for_count(2), SampleTier::Insufficient);
        assert_eq!(SampleTier::for_count(3), SampleTier::Preliminary);
        assert_eq!(SampleTier::for_count(9), SampleTier::Preliminary);
        assert_eq!(SampleTier::for_count(10), SampleTier::Reliable);
    }

    #[test]
    fn test_pressure_trend_boundaries() {
        assert_eq!(PressureTrend::from_change(-3.1), PressureTrend::Falling);
        assert_eq!(PressureTrend::from_change(-3.0), PressureTrend::Stable);
        assert_eq!(PressureTrend::from_change(3.0), PressureTrend::Stable);
        assert_eq!(PressureTrend::from_change(3.5), PressureTrend::Rising);
    }
}
