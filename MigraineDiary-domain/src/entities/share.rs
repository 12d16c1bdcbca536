use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::entry::PainEntry;
use super::statistics::EntryStatistics;

pub use migraine_diary_data::models::share::DoctorShare;

/// Longest allowed share lifetime (one week)
pub const MAX_SHARE_HOURS: u32 = 168;

/// Request to share a date range with a physician
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateShareRequest {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    /// Show free-text notes to the physician
    #[serde(default)]
    pub include_notes: bool,
    /// Lifetime in hours (1-168); server default when absent
    pub expires_in_hours: Option<u32>,
}

/// What the physician sees when opening a share
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct SharedDiary {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub expires_at: DateTime<Utc>,
    pub include_notes: bool,
    /// Entries in range, oldest first; notes removed unless shared
    pub entries: Vec<PainEntry>,
    pub statistics: EntryStatistics,
}
