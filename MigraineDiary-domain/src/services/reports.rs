use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::entities::report::{ReportData, ReportQuery};
use crate::entities::share::SharedDiary;
use crate::entities::LimitCheckRequest;
use crate::services::assessments::AssessmentService;
use crate::services::entries::EntryService;
use crate::services::error::ServiceError;
use crate::services::medications::MedicationLimitService;
use crate::services::pdf;
use crate::services::statistics::StatisticsService;
use migraine_diary_data::models::EntryFilter;
use migraine_diary_data::repository::EntryRepositoryTrait;

/// Gathers report data and renders PDFs
pub struct ReportService {
    entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
    statistics: Arc<StatisticsService>,
    limits: Arc<MedicationLimitService>,
    assessments: Arc<AssessmentService>,
}

impl ReportService {
    pub fn new(
        entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
        statistics: Arc<StatisticsService>,
        limits: Arc<MedicationLimitService>,
        assessments: Arc<AssessmentService>,
    ) -> Self {
        Self {
            entries,
            statistics,
            limits,
            assessments,
        }
    }

    /// Everything the report shows for `[from, to]` (default: last 30 days)
    #[instrument(skip(self))]
    pub async fn build(&self, user_id: &str, query: &ReportQuery, now: DateTime<Utc>) -> Result<ReportData, ServiceError> {
        let (from, to) = EntryService::resolve_window(query.from, query.to, now)?;
        let (entries, _) = self.entries.list(user_id, &EntryFilter::range(from, to)).await?;

        let statistics = self.statistics.for_entries(&entries, from, to).await?;
        let limits = self.limits.check(user_id, &LimitCheckRequest::default(), now).await?;
        let latest_hit6 = self.assessments.latest(user_id).await?;

        Ok(ReportData {
            title: "Headache diary report".to_string(),
            generated_at: now,
            statistics,
            limits,
            latest_hit6,
            entries,
            include_notes: query.include_notes.unwrap_or(false),
        })
    }

    pub async fn render(&self, user_id: &str, query: &ReportQuery, now: DateTime<Utc>) -> Result<Vec<u8>, ServiceError> {
        let data = self.build(user_id, query, now).await?;
        pdf::render_report(&data)
    }

    /// PDF for an opened share; notes were already stripped when not shared
    pub fn render_shared(&self, diary: &SharedDiary) -> Result<Vec<u8>, ServiceError> {
        pdf::render_shared(diary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::assessment::Hit6Request;
    use chrono::Duration;
    use migraine_diary_data::database::DatabasePool;
    use migraine_diary_data::models::NewPainEntry;
    use migraine_diary_data::repository::{AssessmentRepository, EntryRepository, MedicationRepository, WeatherRepository};

    #[tokio::test]
    async fn test_build_and_render_report() {
        let pool = DatabasePool::in_memory().unwrap();
        let entries = Arc::new(EntryRepository::new(pool.clone()));
        let statistics = Arc::new(StatisticsService::new(
            entries.clone(),
            Arc::new(WeatherRepository::new(pool.clone())),
        ));
        let limits = Arc::new(MedicationLimitService::new(
            Arc::new(MedicationRepository::new(pool.clone())),
            entries.clone(),
        ));
        let assessments = Arc::new(AssessmentService::new(Arc::new(AssessmentRepository::new(pool))));
        let service = ReportService::new(entries.clone(), statistics, limits, assessments.clone());

        let now = Utc::now();
        for day in 0..4 {
            entries
                .create(NewPainEntry {
                    user_id: "user-1".to_string(),
                    timestamp: now - Duration::days(day),
                    pain_level: 5,
                    pain_location: None,
                    aura_type: None,
                    triggers: vec![],
                    medications: vec![],
                    me_cfs_severity: None,
                    notes: None,
                    latitude: None,
                    longitude: None,
                })
                .await
                .unwrap();
        }
        assessments
            .submit("user-1", Hit6Request { answers: vec![10; 6] })
            .await
            .unwrap();

        let data = service.build("user-1", &ReportQuery::default(), now).await.unwrap();
        assert_eq!(data.entries.len(), 4);
        assert_eq!(data.statistics.avg_pain, Some(5.0));
        assert_eq!(data.latest_hit6.unwrap().assessment.score, 60);
        assert!(!data.include_notes);

        let bytes = service.render("user-1", &ReportQuery::default(), now).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
