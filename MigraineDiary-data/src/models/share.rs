use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Time-boxed, code-gated read access to part of a user's diary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct DoctorShare {
    pub id: Uuid,
    pub user_id: String,
    /// Access code handed to the physician
    pub code: String,
    /// First shared day (inclusive)
    pub from_date: NaiveDate,
    /// Last shared day (inclusive)
    pub to_date: NaiveDate,
    /// Whether free-text notes are visible to the physician
    pub include_notes: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl DoctorShare {
    /// A share is usable until it expires or is revoked
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Input data for creating a share
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDoctorShare {
    pub user_id: String,
    pub code: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub include_notes: bool,
    pub expires_at: DateTime<Utc>,
}
