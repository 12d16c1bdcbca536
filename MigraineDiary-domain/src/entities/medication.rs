use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

pub use migraine_diary_data::models::medication::{LimitPeriod, MedicationLimit, UserMedication};

/// Request to add a medication to the user's list
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateMedicationRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Dosage must be at most 100 characters"))]
    pub dosage: Option<String>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Partial update of a medication
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateMedicationRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Dosage must be at most 100 characters"))]
    pub dosage: Option<String>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Request to add an intake limit
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateLimitRequest {
    #[validate(length(min = 1, max = 100, message = "Medication name must be between 1 and 100 characters"))]
    pub medication_name: String,

    /// Allowed intakes per period
    #[validate(range(min = 1, max = 1000, message = "Limit must be between 1 and 1000"))]
    pub limit_count: u32,

    pub period: LimitPeriod,
}

/// Partial update of a limit
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateLimitRequest {
    #[validate(range(min = 1, max = 1000, message = "Limit must be between 1 and 1000"))]
    pub limit_count: Option<u32>,

    pub period: Option<LimitPeriod>,

    pub is_active: Option<bool>,
}

/// Which limits to evaluate; all active limits when no names are given
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LimitCheckRequest {
    #[serde(default)]
    pub medication_names: Vec<String>,
}

/// Usage relative to a limit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum LimitStatus {
    Ok,
    /// At least 80 % of the limit used
    Warning,
    Reached,
    Exceeded,
}

impl LimitStatus {
    /// Classify `used` intakes against `limit`
    pub fn classify(used: u32, limit: u32) -> Self {
        if used > limit {
            LimitStatus::Exceeded
        } else if used == limit {
            LimitStatus::Reached
        } else if u64::from(used) * 5 >= u64::from(limit) * 4 {
            LimitStatus::Warning
        } else {
            LimitStatus::Ok
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitStatus::Ok => "ok",
            LimitStatus::Warning => "warning",
            LimitStatus::Reached => "reached",
            LimitStatus::Exceeded => "exceeded",
        }
    }
}

/// Result of checking one limit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LimitCheckResult {
    pub limit_id: Uuid,
    pub medication_name: String,
    pub period: LimitPeriod,
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    /// Start of the counted window
    pub window_start: DateTime<Utc>,
    pub status: LimitStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_status_thresholds() {
        assert_eq!(LimitStatus::classify(0, 10), LimitStatus::Ok);
        assert_eq!(LimitStatus::classify(7, 10), LimitStatus::Ok);
        assert_eq!(LimitStatus::classify(8, 10), LimitStatus::Warning);
        assert_eq!(LimitStatus::classify(10, 10), LimitStatus::Reached);
        assert_eq!(LimitStatus::classify(11, 10), LimitStatus::Exceeded);
        // 80 % of 3 is 2.4, so 2 intakes stay ok
        assert_eq!(LimitStatus::classify(2, 3), LimitStatus::Ok);
        assert_eq!(LimitStatus::classify(1, 1), LimitStatus::Reached);
    }
}
