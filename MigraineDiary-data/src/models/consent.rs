use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::UnknownVariant;

/// Kinds of processing a user can consent to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    /// Storing health data at all
    HealthData,
    /// Sending diary content to the LLM gateway
    AiAnalysis,
    /// Creating physician access codes
    DoctorSharing,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentType::HealthData => "health_data",
            ConsentType::AiAnalysis => "ai_analysis",
            ConsentType::DoctorSharing => "doctor_sharing",
        }
    }
}

impl fmt::Display for ConsentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "health_data" => Ok(ConsentType::HealthData),
            "ai_analysis" => Ok(ConsentType::AiAnalysis),
            "doctor_sharing" => Ok(ConsentType::DoctorSharing),
            other => Err(UnknownVariant::new("consent type", other)),
        }
    }
}

/// One grant of consent; withdrawn grants are kept for the audit trail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UserConsent {
    pub id: Uuid,
    pub user_id: String,
    pub consent_type: ConsentType,
    /// Version of the consent text the user agreed to
    pub version: String,
    pub granted_at: DateTime<Utc>,
    pub withdrawn_at: Option<DateTime<Utc>>,
}
