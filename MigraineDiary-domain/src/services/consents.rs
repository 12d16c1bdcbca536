use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use validator::Validate;

use crate::entities::consent::{ConsentType, GrantConsentRequest, UserConsent};
use crate::services::error::ServiceError;
use migraine_diary_data::repository::ConsentRepositoryTrait;

/// Consent grants and checks
pub struct ConsentService {
    repository: Arc<dyn ConsentRepositoryTrait + Send + Sync>,
}

impl ConsentService {
    pub fn new(repository: Arc<dyn ConsentRepositoryTrait + Send + Sync>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, request))]
    pub async fn grant(&self, user_id: &str, request: GrantConsentRequest) -> Result<UserConsent, ServiceError> {
        request.validate()?;
        let consent = self
            .repository
            .grant(user_id, request.consent_type, request.version.trim(), Utc::now())
            .await?;
        info!("Consent {} version {} active", consent.consent_type, consent.version);
        Ok(consent)
    }

    /// Full history, newest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<UserConsent>, ServiceError> {
        Ok(self.repository.list(user_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn withdraw(&self, user_id: &str, consent_type: ConsentType) -> Result<(), ServiceError> {
        if !self.repository.withdraw(user_id, consent_type, Utc::now()).await? {
            return Err(ServiceError::NotFound(format!("No active {} consent", consent_type)));
        }
        info!("Consent {} withdrawn", consent_type);
        Ok(())
    }

    pub async fn has_active(&self, user_id: &str, consent_type: ConsentType) -> Result<bool, ServiceError> {
        Ok(self.repository.active(user_id, consent_type).await?.is_some())
    }

    /// Fail with `Forbidden` unless the consent is active
    pub async fn require(&self, user_id: &str, consent_type: ConsentType) -> Result<(), ServiceError> {
        if self.has_active(user_id, consent_type).await? {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!("Consent required: {}", consent_type)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migraine_diary_data::database::DatabasePool;
    use migraine_diary_data::repository::ConsentRepository;

    fn service() -> ConsentService {
        ConsentService::new(Arc::new(ConsentRepository::new(DatabasePool::in_memory().unwrap())))
    }

    fn grant(consent_type: ConsentType, version: &str) -> GrantConsentRequest {
        GrantConsentRequest {
            consent_type,
            version: version.to_string(),
        }
    }

    #[tokio::test]
    async fn test_require_follows_grant_and_withdraw() {
        let service = service();

        let missing = service.require("user-1", ConsentType::AiAnalysis).await;
        assert!(matches!(missing, Err(ServiceError::Forbidden(_))));

        service.grant("user-1", grant(ConsentType::AiAnalysis, "1.0")).await.unwrap();
        service.require("user-1", ConsentType::AiAnalysis).await.unwrap();
        assert!(!service.has_active("user-1", ConsentType::DoctorSharing).await.unwrap());

        service.withdraw("user-1", ConsentType::AiAnalysis).await.unwrap();
        assert!(!service.has_active("user-1", ConsentType::AiAnalysis).await.unwrap());

        let again = service.withdraw("user-1", ConsentType::AiAnalysis).await;
        assert!(matches!(again, Err(ServiceError::NotFound(_))));
        assert_eq!(service.list("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_grant_validates_version() {
        let result = service().grant("user-1", grant(ConsentType::HealthData, "")).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
