use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

pub use migraine_diary_data::models::notification::PushSubscription;
pub use migraine_diary_data::models::reminder::{Reminder, ReminderKind, ReminderStatus, RepeatInterval};

/// Request to schedule a reminder
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateReminderRequest {
    pub kind: ReminderKind,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 1000, message = "Body must be at most 1000 characters"))]
    pub body: Option<String>,

    #[validate(length(max = 100, message = "Medication name must be at most 100 characters"))]
    pub medication_name: Option<String>,

    /// First time the reminder fires
    pub date_time: DateTime<Utc>,

    #[serde(default)]
    pub repeat: RepeatInterval,
}

/// Partial update of a reminder.
///
/// Only `pending` and `cancelled` may be set as status; the other states are
/// owned by the reminder processor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateReminderRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Body must be at most 1000 characters"))]
    pub body: Option<String>,

    #[validate(length(max = 100, message = "Medication name must be at most 100 characters"))]
    pub medication_name: Option<String>,

    pub date_time: Option<DateTime<Utc>>,

    pub repeat: Option<RepeatInterval>,

    pub status: Option<ReminderStatus>,
}

/// Request to register a device for push notifications
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreatePushSubscriptionRequest {
    #[validate(length(min = 1, max = 2048, message = "Endpoint must be between 1 and 2048 characters"))]
    pub endpoint: String,
}

/// Outcome of one reminder processor run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ReminderRunReport {
    /// Pending reminders inside the due window
    pub due: usize,
    /// Reminders this run claimed
    pub claimed: usize,
    /// Notifications accepted by the gateway
    pub sent: usize,
    /// One-shot reminders finished
    pub completed: usize,
    /// Repeating reminders moved to their next occurrence
    pub rescheduled: usize,
    /// Reminders released for retry after a delivery failure
    pub failed: usize,
    /// Reminders another worker claimed first
    pub skipped: usize,
    /// Stale claims returned to pending before the run
    pub released_stale: usize,
}
