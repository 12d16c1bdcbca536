use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use uuid::Uuid;

use crate::entities::entry::{EntryFilter, PainEntry};
use crate::entities::statistics::{
    CountItem, EntryStatistics, MeCfsSummary, PressureBucket, PressureTrend, SampleTier, SeverityDistribution,
    WeatherCorrelation, WeekdayPain,
};
use crate::entities::weather::WeatherLog;
use crate::services::error::ServiceError;
use migraine_diary_data::repository::{EntryRepositoryTrait, WeatherRepositoryTrait};

/// Number of triggers and medications listed in the statistics
pub const TOP_ITEMS: usize = 5;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Average that is only reported once the sample is big enough
fn tiered_average(sum: f64, count: usize) -> (Option<f64>, SampleTier) {
    let tier = SampleTier::for_count(count);
    let average = if tier.is_sufficient() {
        Some((sum / count as f64 * 10.0).round() / 10.0)
    } else {
        None
    };
    (average, tier)
}

fn top_items<'a>(names: impl Iterator<Item = &'a String>) -> Vec<CountItem> {
    // Grouped case-insensitively; the first spelling seen is displayed
    let mut counts: HashMap<String, (String, usize)> = HashMap::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        counts
            .entry(trimmed.to_lowercase())
            .or_insert_with(|| (trimmed.to_string(), 0))
            .1 += 1;
    }

    let mut items: Vec<CountItem> = counts
        .into_values()
        .map(|(name, count)| CountItem { name, count })
        .collect();
    items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    items.truncate(TOP_ITEMS);
    items
}

fn distinct_days<'a>(entries: impl Iterator<Item = &'a PainEntry>) -> usize {
    entries
        .map(|entry| entry.timestamp.date_naive())
        .collect::<BTreeSet<NaiveDate>>()
        .len()
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn weather_correlation(entries: &[PainEntry], weather: &[WeatherLog]) -> WeatherCorrelation {
    let by_id: HashMap<Uuid, &WeatherLog> = weather.iter().map(|log| (log.id, log)).collect();

    let mut sums: HashMap<PressureTrend, (f64, usize)> = HashMap::new();
    for entry in entries {
        let change = entry
            .weather_id
            .and_then(|id| by_id.get(&id))
            .and_then(|log| log.pressure_change_24h);
        if let Some(change) = change {
            let slot = sums.entry(PressureTrend::from_change(change)).or_insert((0.0, 0));
            slot.0 += f64::from(entry.pain_level);
            slot.1 += 1;
        }
    }

    let sample_size: usize = sums.values().map(|(_, count)| count).sum();
    let buckets = [PressureTrend::Falling, PressureTrend::Stable, PressureTrend::Rising]
        .into_iter()
        .map(|trend| {
            let (sum, count) = sums.get(&trend).copied().unwrap_or((0.0, 0));
            let (avg_pain, tier) = tiered_average(sum, count);
            PressureBucket {
                trend,
                count,
                avg_pain,
                tier,
            }
        })
        .collect();

    WeatherCorrelation {
        sample_size,
        tier: SampleTier::for_count(sample_size),
        buckets,
    }
}

fn me_cfs_summary(entries: &[PainEntry]) -> MeCfsSummary {
    let recorded: Vec<&PainEntry> = entries.iter().filter(|e| e.me_cfs_severity.is_some()).collect();

    let mut distribution = SeverityDistribution::default();
    let mut sum = 0.0;
    for severity in recorded.iter().filter_map(|e| e.me_cfs_severity) {
        sum += f64::from(severity);
        match severity {
            0 => distribution.none += 1,
            1..=3 => distribution.mild += 1,
            4..=6 => distribution.moderate += 1,
            _ => distribution.severe += 1,
        }
    }

    let (avg_severity, tier) = tiered_average(sum, recorded.len());
    MeCfsSummary {
        sample_size: recorded.len(),
        avg_severity,
        days_recorded: distinct_days(recorded.iter().copied()),
        distribution,
        tier,
    }
}

/// Statistics over a set of entries and the weather logs they reference
pub fn compute(
    entries: &[PainEntry],
    weather: &[WeatherLog],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> EntryStatistics {
    let pain_sum: f64 = entries.iter().map(|e| f64::from(e.pain_level)).sum();
    let (avg_pain, tier) = tiered_average(pain_sum, entries.len());

    let pain_by_weekday = WEEKDAYS
        .iter()
        .map(|weekday| {
            let levels: Vec<f64> = entries
                .iter()
                .filter(|e| e.timestamp.weekday() == *weekday)
                .map(|e| f64::from(e.pain_level))
                .collect();
            let (avg_pain, _) = tiered_average(levels.iter().sum::<f64>(), levels.len());
            WeekdayPain {
                weekday: weekday_name(*weekday).to_string(),
                count: levels.len(),
                avg_pain,
            }
        })
        .collect();

    EntryStatistics {
        from,
        to,
        entry_count: entries.len(),
        pain_days: distinct_days(entries.iter().filter(|e| e.pain_level > 0)),
        avg_pain,
        max_pain: entries.iter().map(|e| e.pain_level).max(),
        medication_days: distinct_days(entries.iter().filter(|e| !e.medications.is_empty())),
        tier,
        top_triggers: top_items(entries.iter().flat_map(|e| e.triggers.iter())),
        top_medications: top_items(entries.iter().flat_map(|e| e.medications.iter())),
        pain_by_weekday,
        weather: weather_correlation(entries, weather),
        me_cfs: me_cfs_summary(entries),
    }
}

/// Loads entries and weather for a range and computes statistics
pub struct StatisticsService {
    entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
    weather: Arc<dyn WeatherRepositoryTrait + Send + Sync>,
}

impl StatisticsService {
    pub fn new(
        entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
        weather: Arc<dyn WeatherRepositoryTrait + Send + Sync>,
    ) -> Self {
        Self { entries, weather }
    }

    pub async fn for_range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<EntryStatistics, ServiceError> {
        if from > to {
            return Err(ServiceError::Validation("from: Start of range must not be after its end".to_string()));
        }
        let (entries, _) = self.entries.list(user_id, &EntryFilter::range(from, to)).await?;
        self.for_entries(&entries, from, to).await
    }

    /// Statistics for entries already loaded by the caller
    pub async fn for_entries(
        &self,
        entries: &[PainEntry],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<EntryStatistics, ServiceError> {
        let weather = self.linked_weather(entries).await?;
        Ok(compute(entries, &weather, from, to))
    }

    /// Weather logs referenced by the entries
    pub async fn linked_weather(&self, entries: &[PainEntry]) -> Result<Vec<WeatherLog>, ServiceError> {
        let ids: Vec<Uuid> = entries
            .iter()
            .filter_map(|e| e.weather_id)
            .collect::<BTreeSet<Uuid>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.weather.get_many(&ids).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry(timestamp: DateTime<Utc>, pain_level: u8) -> PainEntry {
        PainEntry {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            timestamp,
            pain_level,
            pain_location: None,
            aura_type: None,
            triggers: vec![],
            medications: vec![],
            me_cfs_severity: None,
            notes: None,
            latitude: None,
            longitude: None,
            weather_id: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    fn weather(change: f64) -> WeatherLog {
        WeatherLog {
            id: Uuid::new_v4(),
            latitude: 48.14,
            longitude: 11.58,
            observed_at: Utc::now(),
            temperature_c: Some(12.0),
            pressure_hpa: Some(1010.0),
            pressure_change_24h: Some(change),
            humidity: None,
            precipitation_mm: None,
            wind_speed_kmh: None,
            weather_code: None,
            source: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    fn monday() -> DateTime<Utc> {
        // 2024-03-04 was a Monday
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_small_samples_hide_averages() {
        let entries = vec![entry(monday(), 8), entry(monday() + Duration::days(1), 4)];
        let stats = compute(&entries, &[], monday(), monday() + Duration::days(7));

        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.tier, SampleTier::Insufficient);
        assert_eq!(stats.avg_pain, None);
        assert_eq!(stats.max_pain, Some(8));
        assert_eq!(stats.pain_days, 2);
    }

    #[test]
    fn test_averages_and_days() {
        let mut entries = vec![
            entry(monday(), 6),
            entry(monday() + Duration::hours(3), 0),
            entry(monday() + Duration::days(2), 9),
        ];
        entries[0].medications = vec!["Ibuprofen".to_string(), "ibuprofen".to_string()];
        entries[2].medications = vec!["Sumatriptan".to_string()];

        let stats = compute(&entries, &[], monday(), monday() + Duration::days(7));
        assert_eq!(stats.tier, SampleTier::Preliminary);
        assert_eq!(stats.avg_pain, Some(5.0));
        // The pain-free entry does not make its day a pain day, but the day already has one
        assert_eq!(stats.pain_days, 2);
        assert_eq!(stats.medication_days, 2);
        assert_eq!(
            stats.top_medications,
            vec![
                CountItem { name: "Ibuprofen".to_string(), count: 2 },
                CountItem { name: "Sumatriptan".to_string(), count: 1 },
            ]
        );
        assert_eq!(stats.pain_by_weekday[0].weekday, "monday");
        assert_eq!(stats.pain_by_weekday[0].count, 2);
        assert_eq!(stats.pain_by_weekday[0].avg_pain, None);
    }

    #[test]
    fn test_top_triggers_limited_and_tie_broken_by_name() {
        let mut e = entry(monday(), 5);
        e.triggers = ["g", "f", "e", "d", "c", "b", "a", "a"].iter().map(|s| s.to_string()).collect();
        let stats = compute(&[e], &[], monday(), monday());

        let names: Vec<&str> = stats.top_triggers.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(stats.top_triggers[0].count, 2);
    }

    #[test]
    fn test_weather_buckets() {
        let falling = weather(-5.0);
        let stable = weather(1.0);
        let mut entries = Vec::new();
        for (i, pain) in [7u8, 8, 9].iter().enumerate() {
            let mut e = entry(monday() + Duration::days(i as i64), *pain);
            e.weather_id = Some(falling.id);
            entries.push(e);
        }
        let mut calm = entry(monday(), 2);
        calm.weather_id = Some(stable.id);
        entries.push(calm);
        entries.push(entry(monday(), 3));

        let stats = compute(&entries, &[falling, stable], monday(), monday() + Duration::days(7));
        assert_eq!(stats.weather.sample_size, 4);
        assert_eq!(stats.weather.tier, SampleTier::Preliminary);

        let falling_bucket = &stats.weather.buckets[0];
        assert_eq!(falling_bucket.trend, PressureTrend::Falling);
        assert_eq!(falling_bucket.count, 3);
        assert_eq!(falling_bucket.avg_pain, Some(8.0));

        let stable_bucket = &stats.weather.buckets[1];
        assert_eq!(stable_bucket.count, 1);
        assert_eq!(stable_bucket.avg_pain, None);
        assert_eq!(stable_bucket.tier, SampleTier::Insufficient);
        assert_eq!(stats.weather.buckets[2].count, 0);
    }

    #[test]
    fn test_me_cfs_distribution() {
        let entries: Vec<PainEntry> = [Some(0u8), Some(2), Some(5), Some(9), None]
            .iter()
            .enumerate()
            .map(|(i, severity)| {
                let mut e = entry(monday() + Duration::days(i as i64), 4);
                e.me_cfs_severity = *severity;
                e
            })
            .collect();

        let summary = compute(&entries, &[], monday(), monday() + Duration::days(7)).me_cfs;
        assert_eq!(summary.sample_size, 4);
        assert_eq!(summary.days_recorded, 4);
        assert_eq!(summary.avg_severity, Some(4.0));
        assert_eq!(
            summary.distribution,
            SeverityDistribution { none: 1, mild: 1, moderate: 1, severe: 1 }
        );
        assert_eq!(summary.tier, SampleTier::Preliminary);
    }
}
