use std::sync::Arc;

use thiserror::Error;

use migraine_diary_data::database::DatabasePool;
use migraine_diary_data::repository::{
    AccountRepository, AssessmentRepository, ConsentRepository, EntryRepository, MedicationRepository,
    PushSubscriptionRepository, ReminderRepository, ShareRepository, WeatherRepository,
};
use migraine_diary_domain::auth::CronSecret;
use migraine_diary_domain::clients::push::sender_from_config;
use migraine_diary_domain::clients::{
    LlmClient, LlmError, NotificationError, NotificationSender, OpenAiCompatibleClient, OpenMeteoProvider,
    WeatherError, WeatherProvider,
};
use migraine_diary_domain::config::AppConfig;
use migraine_diary_domain::health::{HealthService, HealthServiceTrait};
use migraine_diary_domain::services::{
    AccountRepositories, AccountService, AiReportService, AssessmentService, ConsentService, EntryService,
    EntryServiceTrait, MedicationLimitService, MedicationService, ReminderService, ReportService, ShareService,
    StatisticsService, WeatherService,
};

/// Outbound client construction failures at startup
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Weather client: {0}")]
    Weather(#[from] WeatherError),

    #[error("Push client: {0}")]
    Push(#[from] NotificationError),

    #[error("LLM client: {0}")]
    Llm(#[from] LlmError),
}

/// Outbound integrations; tests swap in fakes
#[derive(Clone)]
pub struct Clients {
    pub weather: Arc<dyn WeatherProvider>,
    pub push: Arc<dyn NotificationSender>,
    pub llm: Arc<dyn LlmClient>,
}

impl Clients {
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Ok(Self {
            weather: Arc::new(OpenMeteoProvider::new(&config.weather)?),
            push: sender_from_config(&config.push)?,
            llm: Arc::new(OpenAiCompatibleClient::new(&config.llm)?),
        })
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub entries: Arc<dyn EntryServiceTrait>,
    pub medications: Arc<MedicationService>,
    pub limits: Arc<MedicationLimitService>,
    pub reminders: Arc<ReminderService>,
    pub weather: Arc<WeatherService>,
    pub statistics: Arc<StatisticsService>,
    pub assessments: Arc<AssessmentService>,
    pub reports: Arc<ReportService>,
    pub ai_reports: Arc<AiReportService>,
    pub shares: Arc<ShareService>,
    pub consents: Arc<ConsentService>,
    pub account: Arc<AccountService>,
    pub health: Arc<dyn HealthServiceTrait + Send + Sync>,
    pub cron_secret: CronSecret,
    pub environment: String,
}

impl AppState {
    /// Wire repositories, services and clients over one pool
    pub fn new(config: &AppConfig, pool: DatabasePool, clients: Clients) -> Self {
        let entry_repo = Arc::new(EntryRepository::new(pool.clone()));
        let medication_repo = Arc::new(MedicationRepository::new(pool.clone()));
        let reminder_repo = Arc::new(ReminderRepository::new(pool.clone()));
        let subscription_repo = Arc::new(PushSubscriptionRepository::new(pool.clone()));
        let weather_repo = Arc::new(WeatherRepository::new(pool.clone()));
        let share_repo = Arc::new(ShareRepository::new(pool.clone()));
        let consent_repo = Arc::new(ConsentRepository::new(pool.clone()));
        let assessment_repo = Arc::new(AssessmentRepository::new(pool.clone()));
        let account_repo = Arc::new(AccountRepository::new(pool.clone()));

        let statistics = Arc::new(StatisticsService::new(entry_repo.clone(), weather_repo.clone()));
        let consents = Arc::new(ConsentService::new(consent_repo.clone()));
        let limits = Arc::new(MedicationLimitService::new(medication_repo.clone(), entry_repo.clone()));
        let assessments = Arc::new(AssessmentService::new(assessment_repo.clone()));

        Self {
            entries: Arc::new(EntryService::new(entry_repo.clone())),
            medications: Arc::new(MedicationService::new(medication_repo.clone())),
            limits: limits.clone(),
            reminders: Arc::new(ReminderService::new(
                reminder_repo.clone(),
                subscription_repo.clone(),
                clients.push,
            )),
            weather: Arc::new(WeatherService::new(
                clients.weather,
                weather_repo.clone(),
                entry_repo.clone(),
                config.weather.backfill_batch_size,
                config.weather.request_delay,
            )),
            statistics: statistics.clone(),
            assessments: assessments.clone(),
            reports: Arc::new(ReportService::new(
                entry_repo.clone(),
                statistics.clone(),
                limits,
                assessments,
            )),
            ai_reports: Arc::new(AiReportService::new(
                entry_repo.clone(),
                statistics.clone(),
                consents.clone(),
                clients.llm,
            )),
            shares: Arc::new(ShareService::new(
                share_repo.clone(),
                entry_repo.clone(),
                statistics,
                consents.clone(),
                config.share_default_hours,
            )),
            consents,
            account: Arc::new(AccountService::new(AccountRepositories {
                account: account_repo,
                entries: entry_repo,
                medications: medication_repo,
                reminders: reminder_repo,
                subscriptions: subscription_repo,
                shares: share_repo,
                consents: consent_repo,
                assessments: assessment_repo,
                weather: weather_repo,
            })),
            health: Arc::new(HealthService::new(pool, config.llm.api_key.is_some())),
            cron_secret: CronSecret(config.cron_secret.clone()),
            environment: config.environment.clone(),
        }
    }
}
