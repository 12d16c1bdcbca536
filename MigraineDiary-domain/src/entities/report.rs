use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::assessment::Hit6Result;
use super::consent::UserConsent;
use super::entry::PainEntry;
use super::medication::{LimitCheckResult, MedicationLimit, UserMedication};
use super::reminder::{PushSubscription, Reminder};
use super::share::DoctorShare;
use super::statistics::EntryStatistics;
use super::weather::WeatherLog;
use migraine_diary_data::models::assessment::Hit6Assessment;

/// Parameters for a PDF report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Print free-text notes in the entry table
    pub include_notes: Option<bool>,
}

/// Everything a PDF report shows, gathered before rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub statistics: EntryStatistics,
    pub limits: Vec<LimitCheckResult>,
    pub latest_hit6: Option<Hit6Result>,
    pub entries: Vec<PainEntry>,
    pub include_notes: bool,
}

/// Narrative report from the LLM gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AiReport {
    pub report: String,
    pub model: String,
    /// Entries in the requested range
    pub entry_count: usize,
    pub generated_at: DateTime<Utc>,
}

/// Request for a narrative report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AiReportRequest {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Every row owned by a user, for data-portability requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AccountExport {
    pub user_id: String,
    pub exported_at: DateTime<Utc>,
    pub entries: Vec<PainEntry>,
    pub medications: Vec<UserMedication>,
    pub medication_limits: Vec<MedicationLimit>,
    pub reminders: Vec<Reminder>,
    pub push_subscriptions: Vec<PushSubscription>,
    pub doctor_shares: Vec<DoctorShare>,
    pub consents: Vec<UserConsent>,
    pub assessments: Vec<Hit6Assessment>,
    /// Observations referenced by the exported entries
    pub weather_logs: Vec<WeatherLog>,
}

/// Rows removed by an erasure request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct DeletionReport {
    pub user_id: String,
    pub deleted: BTreeMap<String, usize>,
    pub total: usize,
}
