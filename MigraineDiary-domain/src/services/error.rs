use thiserror::Error;
use validator::ValidationErrors;

use crate::clients::llm::LlmError;
use crate::clients::weather::WeatherError;
use migraine_diary_data::repository::RepositoryError;

/// Errors returned by the domain services
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected before touching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// The row does not exist or belongs to someone else
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation requires a consent the user has not granted
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The upstream provider asked for payment
    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// An external service failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A required collaborator is not configured
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => ServiceError::Validation(msg),
            RepositoryError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Repository(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(validation_message(&errors))
    }
}

impl From<WeatherError> for ServiceError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::NoData(msg) => ServiceError::NotFound(msg),
            other => ServiceError::Upstream(other.to_string()),
        }
    }
}

impl From<LlmError> for ServiceError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey => ServiceError::Unavailable(err.to_string()),
            LlmError::RateLimited(msg) => ServiceError::RateLimited(msg),
            LlmError::PaymentRequired(msg) => ServiceError::PaymentRequired(msg),
            other => ServiceError::Upstream(other.to_string()),
        }
    }
}

/// Flatten validator errors into "field: message; field: message"
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid {}", field),
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect();
    // field_errors is a HashMap
    fields.sort();
    fields.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    use crate::entities::CreateMedicationRequest;

    #[test]
    fn test_repository_errors_keep_their_meaning() {
        assert!(matches!(
            ServiceError::from(RepositoryError::NotFound("x".into())),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            ServiceError::from(RepositoryError::Conflict("x".into())),
            ServiceError::Conflict(_)
        ));
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let request = CreateMedicationRequest {
            name: String::new(),
            dosage: None,
            notes: None,
        };
        let err = ServiceError::from(request.validate().unwrap_err());
        assert!(err.to_string().contains("name: Name must be between 1 and 100 characters"));
    }

    #[test]
    fn test_llm_errors_map_to_gateway_statuses() {
        assert!(matches!(ServiceError::from(LlmError::MissingApiKey), ServiceError::Unavailable(_)));
        assert!(matches!(
            ServiceError::from(LlmError::RateLimited("slow down".into())),
            ServiceError::RateLimited(_)
        ));
        assert!(matches!(
            ServiceError::from(LlmError::PaymentRequired("credits".into())),
            ServiceError::PaymentRequired(_)
        ));
    }
}
