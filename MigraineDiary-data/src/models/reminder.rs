use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::UnknownVariant;

/// What a reminder is about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Medication,
    Appointment,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::Medication => "medication",
            ReminderKind::Appointment => "appointment",
        }
    }
}

impl FromStr for ReminderKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medication" => Ok(ReminderKind::Medication),
            "appointment" => Ok(ReminderKind::Appointment),
            other => Err(UnknownVariant::new("reminder kind", other)),
        }
    }
}

/// Recurrence of a reminder
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RepeatInterval {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl RepeatInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatInterval::None => "none",
            RepeatInterval::Daily => "daily",
            RepeatInterval::Weekly => "weekly",
            RepeatInterval::Monthly => "monthly",
        }
    }
}

impl FromStr for RepeatInterval {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(RepeatInterval::None),
            "daily" => Ok(RepeatInterval::Daily),
            "weekly" => Ok(RepeatInterval::Weekly),
            "monthly" => Ok(RepeatInterval::Monthly),
            other => Err(UnknownVariant::new("repeat interval", other)),
        }
    }
}

/// Lifecycle status of a reminder row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    /// Waiting for its `date_time`
    Pending,
    /// Claimed by a processor run
    Processing,
    /// Delivered and not repeating
    Completed,
    /// Switched off by the user
    Cancelled,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Processing => "processing",
            ReminderStatus::Completed => "completed",
            ReminderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReminderStatus::Pending),
            "processing" => Ok(ReminderStatus::Processing),
            "completed" => Ok(ReminderStatus::Completed),
            "cancelled" => Ok(ReminderStatus::Cancelled),
            other => Err(UnknownVariant::new("reminder status", other)),
        }
    }
}

/// Storage model for a scheduled reminder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: String,
    pub kind: ReminderKind,
    pub title: String,
    pub body: Option<String>,
    pub medication_name: Option<String>,
    /// Next time the reminder fires
    pub date_time: DateTime<Utc>,
    pub repeat: RepeatInterval,
    pub status: ReminderStatus,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input data for creating a reminder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    pub user_id: String,
    pub kind: ReminderKind,
    pub title: String,
    pub body: Option<String>,
    pub medication_name: Option<String>,
    pub date_time: DateTime<Utc>,
    pub repeat: RepeatInterval,
}
