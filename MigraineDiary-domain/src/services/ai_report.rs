use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::clients::LlmClient;
use crate::entities::consent::ConsentType;
use crate::entities::entry::{EntryFilter, PainEntry};
use crate::entities::report::{AiReport, AiReportRequest};
use crate::entities::statistics::EntryStatistics;
use crate::services::consents::ConsentService;
use crate::services::entries::EntryService;
use crate::services::error::ServiceError;
use crate::services::statistics::StatisticsService;
use migraine_diary_data::repository::EntryRepositoryTrait;

/// Newest entries sent to the model
pub const MAX_PROMPT_ENTRIES: usize = 200;

const SYSTEM_PROMPT: &str = "You summarise a patient's headache diary for the patient and their physician. \
Describe patterns in frequency, intensity, triggers, medication use and weather. \
Point out possible medication overuse when intake is frequent. \
Do not diagnose and do not recommend specific drugs or doses. \
Answer in plain prose with short paragraphs.";

pub fn build_prompt(stats: &EntryStatistics, entries: &[PainEntry]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Diary period: {} to {}",
        stats.from.format("%Y-%m-%d"),
        stats.to.format("%Y-%m-%d")
    );
    let _ = writeln!(
        prompt,
        "Entries: {}, pain days: {}, days with medication: {}",
        stats.entry_count, stats.pain_days, stats.medication_days
    );
    if let Some(avg) = stats.avg_pain {
        let _ = writeln!(prompt, "Average pain: {:.1} / 10, maximum: {}", avg, stats.max_pain.unwrap_or(0));
    }
    for item in &stats.top_triggers {
        let _ = writeln!(prompt, "Trigger {}: {} times", item.name, item.count);
    }
    for item in &stats.top_medications {
        let _ = writeln!(prompt, "Medication {}: {} times", item.name, item.count);
    }
    for bucket in stats.weather.buckets.iter().filter(|b| b.count > 0) {
        let _ = writeln!(
            prompt,
            "Pressure {:?}: {} entries, average pain {}",
            bucket.trend,
            bucket.count,
            bucket.avg_pain.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "n/a".to_string())
        );
    }

    prompt.push_str("\nEntries (newest first):\n");
    for entry in entries {
        let _ = write!(prompt, "- {} pain {}", entry.timestamp.format("%Y-%m-%d %H:%M"), entry.pain_level);
        if let Some(location) = &entry.pain_location {
            let _ = write!(prompt, ", location {}", location);
        }
        if let Some(aura) = &entry.aura_type {
            let _ = write!(prompt, ", aura {}", aura);
        }
        if !entry.triggers.is_empty() {
            let _ = write!(prompt, ", triggers {}", entry.triggers.join("/"));
        }
        if !entry.medications.is_empty() {
            let _ = write!(prompt, ", medications {}", entry.medications.join("/"));
        }
        if let Some(severity) = entry.me_cfs_severity {
            let _ = write!(prompt, ", ME/CFS {}", severity);
        }
        prompt.push('\n');
    }
    prompt
}

/// Narrative reports from the LLM gateway
pub struct AiReportService {
    entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
    statistics: Arc<StatisticsService>,
    consents: Arc<ConsentService>,
    llm: Arc<dyn LlmClient>,
}

impl AiReportService {
    pub fn new(
        entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
        statistics: Arc<StatisticsService>,
        consents: Arc<ConsentService>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            entries,
            statistics,
            consents,
            llm,
        }
    }

    /// Notes never leave the service; only structured fields go into the prompt
    #[instrument(skip(self, request))]
    pub async fn generate(
        &self,
        user_id: &str,
        request: AiReportRequest,
        now: DateTime<Utc>,
    ) -> Result<AiReport, ServiceError> {
        self.consents.require(user_id, ConsentType::AiAnalysis).await?;

        let (from, to) = EntryService::resolve_window(request.from, request.to, now)?;
        let filter = EntryFilter {
            limit: Some(MAX_PROMPT_ENTRIES),
            sort_desc: true,
            ..EntryFilter::range(from, to)
        };
        let (entries, total) = self.entries.list(user_id, &filter).await?;
        if entries.is_empty() {
            return Err(ServiceError::Validation(
                "range: No entries in the selected period".to_string(),
            ));
        }

        // Statistics cover the whole range; only the listed entries are capped
        let statistics = self.statistics.for_range(user_id, from, to).await?;
        let prompt = build_prompt(&statistics, &entries);
        let completion = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;

        info!(
            "AI report generated from {} of {} entries with {}",
            entries.len(),
            total,
            completion.model
        );
        Ok(AiReport {
            report: completion.content,
            model: completion.model,
            entry_count: total,
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::LlmError;
    use crate::entities::consent::GrantConsentRequest;
    use crate::testing::FakeLlmClient;
    use chrono::Duration;
    use migraine_diary_data::database::DatabasePool;
    use migraine_diary_data::models::NewPainEntry;
    use migraine_diary_data::repository::{ConsentRepository, EntryRepository, WeatherRepository};

    struct Fixture {
        service: AiReportService,
        consents: Arc<ConsentService>,
        entries: Arc<EntryRepository>,
        llm: Arc<FakeLlmClient>,
    }

    fn fixture(llm: FakeLlmClient) -> Fixture {
        let pool = DatabasePool::in_memory().unwrap();
        let entries = Arc::new(EntryRepository::new(pool.clone()));
        let consents = Arc::new(ConsentService::new(Arc::new(ConsentRepository::new(pool.clone()))));
        let statistics = Arc::new(StatisticsService::new(
            entries.clone(),
            Arc::new(WeatherRepository::new(pool)),
        ));
        let llm = Arc::new(llm);
        let service = AiReportService::new(entries.clone(), statistics, consents.clone(), llm.clone());
        Fixture {
            service,
            consents,
            entries,
            llm,
        }
    }

    async fn allow_ai(consents: &ConsentService) {
        consents
            .grant(
                "user-1",
                GrantConsentRequest {
                    consent_type: ConsentType::AiAnalysis,
                    version: "1".to_string(),
                },
            )
            .await
            .unwrap();
    }

    async fn add_entries(entries: &EntryRepository, count: i64, now: DateTime<Utc>) {
        for i in 0..count {
            entries
                .create(NewPainEntry {
                    user_id: "user-1".to_string(),
                    timestamp: now - Duration::minutes(i * 10),
                    pain_level: 6,
                    pain_location: Some("temple".to_string()),
                    aura_type: None,
                    triggers: vec!["stress".to_string()],
                    medications: vec!["Sumatriptan".to_string()],
                    me_cfs_severity: None,
                    notes: Some("secret note".to_string()),
                    latitude: None,
                    longitude: None,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_requires_ai_consent() {
        let f = fixture(FakeLlmClient::answering("report"));
        let result = f.service.generate("user-1", AiReportRequest::default(), Utc::now()).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
        assert!(f.llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_caps_entries_and_keeps_notes_out_of_prompt() {
        let f = fixture(FakeLlmClient::answering("Stress is the most common trigger."));
        allow_ai(&f.consents).await;
        let now = Utc::now();
        add_entries(&f.entries, 205, now).await;

        let report = f.service.generate("user-1", AiReportRequest::default(), now).await.unwrap();
        assert_eq!(report.entry_count, 205);
        assert_eq!(report.report, "Stress is the most common trigger.");

        let prompts = f.llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Entries: 205,"));
        assert_eq!(prompts[0].matches("\n- ").count(), MAX_PROMPT_ENTRIES);
        assert!(prompts[0].contains("Trigger stress"));
        assert!(!prompts[0].contains("secret note"));
    }

    #[tokio::test]
    async fn test_empty_range_is_rejected() {
        let f = fixture(FakeLlmClient::answering("unused"));
        allow_ai(&f.consents).await;
        let result = f.service.generate("user-1", AiReportRequest::default(), Utc::now()).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_gateway_errors_are_mapped() {
        let f = fixture(FakeLlmClient::failing(LlmError::RateLimited("slow down".to_string())));
        allow_ai(&f.consents).await;
        let now = Utc::now();
        add_entries(&f.entries, 1, now).await;

        let result = f.service.generate("user-1", AiReportRequest::default(), now).await;
        assert!(matches!(result, Err(ServiceError::RateLimited(_))));
    }
}
