use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::UnknownVariant;

/// A medication on the user's personal list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UserMedication {
    pub id: Uuid,
    pub user_id: String,
    /// Display name, unique per user ignoring case
    pub name: String,
    pub dosage: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input data for adding a medication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUserMedication {
    pub user_id: String,
    pub name: String,
    pub dosage: Option<String>,
    pub notes: Option<String>,
}

/// Window over which a medication limit is counted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum LimitPeriod {
    /// Since midnight UTC today
    Day,
    /// Rolling seven days
    Week,
    /// Rolling thirty days
    Month,
}

impl LimitPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitPeriod::Day => "day",
            LimitPeriod::Week => "week",
            LimitPeriod::Month => "month",
        }
    }
}

impl fmt::Display for LimitPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitPeriod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(LimitPeriod::Day),
            "week" => Ok(LimitPeriod::Week),
            "month" => Ok(LimitPeriod::Month),
            other => Err(UnknownVariant::new("limit period", other)),
        }
    }
}

/// A user-configured ceiling on intakes of one medication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct MedicationLimit {
    pub id: Uuid,
    pub user_id: String,
    pub medication_name: String,
    /// Maximum number of intakes within one period
    pub limit_count: u32,
    pub period: LimitPeriod,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input data for creating a medication limit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMedicationLimit {
    pub user_id: String,
    pub medication_name: String,
    pub limit_count: u32,
    pub period: LimitPeriod,
}
