use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::entities::assessment::{Hit6Request, Hit6Result, HIT6_ANSWER_VALUES, HIT6_ITEMS};
use crate::services::error::ServiceError;
use migraine_diary_data::models::NewHit6Assessment;
use migraine_diary_data::repository::AssessmentRepositoryTrait;

/// Check the answers and return the total score (36-78)
pub fn score_answers(answers: &[u8]) -> Result<u8, ServiceError> {
    if answers.len() != HIT6_ITEMS {
        return Err(ServiceError::Validation(format!(
            "answers: Exactly {} answers are required",
            HIT6_ITEMS
        )));
    }
    if let Some(bad) = answers.iter().find(|a| !HIT6_ANSWER_VALUES.contains(*a)) {
        return Err(ServiceError::Validation(format!(
            "answers: {} is not a valid answer value",
            bad
        )));
    }
    Ok(answers.iter().sum())
}

/// HIT-6 questionnaire storage
pub struct AssessmentService {
    repository: Arc<dyn AssessmentRepositoryTrait + Send + Sync>,
}

impl AssessmentService {
    pub fn new(repository: Arc<dyn AssessmentRepositoryTrait + Send + Sync>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, request))]
    pub async fn submit(&self, user_id: &str, request: Hit6Request) -> Result<Hit6Result, ServiceError> {
        let score = score_answers(&request.answers)?;
        let stored = self
            .repository
            .create(NewHit6Assessment {
                user_id: user_id.to_string(),
                answers: request.answers,
                score,
                completed_at: Utc::now(),
            })
            .await?;
        Ok(stored.into())
    }

    /// Newest first
    pub async fn list(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<Hit6Result>, ServiceError> {
        let assessments = self.repository.list(user_id, limit).await?;
        Ok(assessments.into_iter().map(Hit6Result::from).collect())
    }

    pub async fn latest(&self, user_id: &str) -> Result<Option<Hit6Result>, ServiceError> {
        Ok(self.repository.latest(user_id).await?.map(Hit6Result::from))
    }
}
