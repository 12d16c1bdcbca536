use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

pub use migraine_diary_data::models::consent::{ConsentType, UserConsent};

/// Request to grant a consent
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct GrantConsentRequest {
    pub consent_type: ConsentType,

    /// Version of the consent text shown to the user
    #[validate(length(min = 1, max = 32, message = "Version must be between 1 and 32 characters"))]
    pub version: String,
}
