use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Storage model for a logged pain episode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PainEntry {
    /// Unique identifier for the entry
    pub id: Uuid,

    /// Owner of the entry
    pub user_id: String,

    /// When the episode started
    pub timestamp: DateTime<Utc>,

    /// Pain intensity on a 0-10 scale
    pub pain_level: u8,

    /// Where the pain was felt (e.g. "left temple")
    pub pain_location: Option<String>,

    /// Aura description, if any
    pub aura_type: Option<String>,

    /// Suspected triggers
    pub triggers: Vec<String>,

    /// Medications taken for this episode; one element per intake
    pub medications: Vec<String>,

    /// ME/CFS symptom severity on a 0-10 scale
    pub me_cfs_severity: Option<u8>,

    /// Free-text notes
    pub notes: Option<String>,

    /// Latitude where the entry was logged
    pub latitude: Option<f64>,

    /// Longitude where the entry was logged
    pub longitude: Option<f64>,

    /// Linked weather observation
    pub weather_id: Option<Uuid>,

    /// When the entry was created
    pub created_at: DateTime<Utc>,

    /// When the entry was last changed
    pub updated_at: DateTime<Utc>,
}

impl PainEntry {
    /// Coordinates of the entry when both halves are present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Input data for inserting a pain entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPainEntry {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub pain_level: u8,
    pub pain_location: Option<String>,
    pub aura_type: Option<String>,
    pub triggers: Vec<String>,
    pub medications: Vec<String>,
    pub me_cfs_severity: Option<u8>,
    pub notes: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Filter for listing entries
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Inclusive lower bound on `timestamp`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`
    pub to: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `timestamp`
    pub before: Option<DateTime<Utc>>,
    /// Maximum number of rows; `None` returns everything
    pub limit: Option<usize>,
    /// Rows to skip
    pub offset: Option<usize>,
    /// Newest first when true
    pub sort_desc: bool,
}

impl EntryFilter {
    /// Every entry in `[from, to]`, oldest first
    pub fn range(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    /// Every entry in `[from, before)`, oldest first
    pub fn half_open(from: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            before: Some(before),
            ..Self::default()
        }
    }
}
