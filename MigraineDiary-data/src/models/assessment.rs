use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Stored HIT-6 questionnaire result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Hit6Assessment {
    pub id: Uuid,
    pub user_id: String,
    /// Item scores in question order
    pub answers: Vec<u8>,
    /// Sum of the item scores
    pub score: u8,
    pub completed_at: DateTime<Utc>,
}

/// Input data for storing a questionnaire result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHit6Assessment {
    pub user_id: String,
    pub answers: Vec<u8>,
    pub score: u8,
    pub completed_at: DateTime<Utc>,
}
