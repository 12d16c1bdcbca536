use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

pub use migraine_diary_data::models::entry::{EntryFilter, PainEntry};

/// Request to log a pain episode
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateEntryRequest {
    /// When the episode started; defaults to now
    pub timestamp: Option<DateTime<Utc>>,

    /// Pain intensity (0-10)
    #[validate(range(min = 0, max = 10, message = "Pain level must be between 0 and 10"))]
    pub pain_level: u8,

    /// Where the pain was felt
    #[validate(length(max = 200, message = "Pain location must be at most 200 characters"))]
    pub pain_location: Option<String>,

    /// Aura description
    #[validate(length(max = 200, message = "Aura type must be at most 200 characters"))]
    pub aura_type: Option<String>,

    /// Suspected triggers
    #[serde(default)]
    pub triggers: Vec<String>,

    /// Medications taken, one element per intake
    #[serde(default)]
    pub medications: Vec<String>,

    /// ME/CFS symptom severity (0-10)
    #[validate(range(min = 0, max = 10, message = "ME/CFS severity must be between 0 and 10"))]
    pub me_cfs_severity: Option<u8>,

    /// Free-text notes
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,

    /// Latitude where the entry was logged
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    /// Longitude where the entry was logged
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
}

/// Partial update of an entry; absent fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateEntryRequest {
    pub timestamp: Option<DateTime<Utc>>,

    #[validate(range(min = 0, max = 10, message = "Pain level must be between 0 and 10"))]
    pub pain_level: Option<u8>,

    #[validate(length(max = 200, message = "Pain location must be at most 200 characters"))]
    pub pain_location: Option<String>,

    #[validate(length(max = 200, message = "Aura type must be at most 200 characters"))]
    pub aura_type: Option<String>,

    pub triggers: Option<Vec<String>>,

    pub medications: Option<Vec<String>>,

    #[validate(range(min = 0, max = 10, message = "ME/CFS severity must be between 0 and 10"))]
    pub me_cfs_severity: Option<u8>,

    /// An empty string clears the notes
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
}

/// Listing parameters; dates default to the last 30 days
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Newest first unless false
    pub sort_desc: Option<bool>,
}
