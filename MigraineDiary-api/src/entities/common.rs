use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use migraine_diary_domain::entities::{EntryQuery, PainEntry, ReminderStatus, ReportQuery, StatisticsQuery, WeatherLog};

/// Query parameters for listing pain entries
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct EntryListParams {
    /// ISO 8601 start (default: 30 days before `to`)
    pub from: Option<DateTime<Utc>>,

    /// ISO 8601 end (default: now)
    pub to: Option<DateTime<Utc>>,

    /// Maximum number of results (default: 100, max: 1000)
    pub limit: Option<usize>,

    /// Pagination offset (default: 0)
    pub offset: Option<usize>,

    /// Sort direction (asc/desc, default: desc)
    pub sort: Option<String>,
}

impl From<EntryListParams> for EntryQuery {
    fn from(params: EntryListParams) -> Self {
        EntryQuery {
            from: params.from,
            to: params.to,
            limit: params.limit,
            offset: params.offset,
            sort_desc: params.sort.map(|sort| !sort.eq_ignore_ascii_case("asc")),
        }
    }
}

/// Date range shared by statistics and AI report requests
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct RangeParams {
    /// ISO 8601 start (default: 30 days before `to`)
    pub from: Option<DateTime<Utc>>,

    /// ISO 8601 end (default: now)
    pub to: Option<DateTime<Utc>>,
}

impl From<RangeParams> for StatisticsQuery {
    fn from(params: RangeParams) -> Self {
        StatisticsQuery {
            from: params.from,
            to: params.to,
        }
    }
}

/// Query parameters for the PDF report
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ReportParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Print free-text notes (default: false)
    pub include_notes: Option<bool>,
}

impl From<ReportParams> for ReportQuery {
    fn from(params: ReportParams) -> Self {
        ReportQuery {
            from: params.from,
            to: params.to,
            include_notes: params.include_notes,
        }
    }
}

/// Filter for the reminder list
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ReminderListParams {
    /// Only reminders in this state
    #[param(value_type = Option<String>)]
    pub status: Option<ReminderStatus>,
}

/// Lookup of the cached weather for a place and time
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct WeatherParams {
    pub latitude: f64,
    pub longitude: f64,
    /// ISO 8601 time (default: now)
    pub at: Option<DateTime<Utc>>,
}

/// Observation plus whether it came from the local cache
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherResponse {
    pub observation: WeatherLog,
    pub cached: bool,
}

/// Optional restriction of a backfill run to one user's entries
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct BackfillParams {
    pub user_id: Option<String>,
}

/// Number of assessments to return
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AssessmentListParams {
    pub limit: Option<usize>,
}

/// Paginated response format
#[derive(Debug, Serialize, ToSchema)]
#[aliases(PaginatedEntries = PaginatedResponse<PainEntry>)]
pub struct PaginatedResponse<T> {
    /// The data items for this page
    pub data: Vec<T>,

    /// Total number of items matching the query
    pub total: usize,

    /// Number of items returned
    pub count: usize,

    /// Number of items skipped
    pub offset: usize,

    /// Page size used
    pub limit: usize,
}
