use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// A device registered to receive push notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PushSubscription {
    pub id: Uuid,
    pub user_id: String,
    /// Opaque endpoint understood by the push gateway
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
}
