use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use migraine_diary_domain::auth::CRON_SECRET_HEADER;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the bearer and cron-secret schemes the paths refer to
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
            components.add_security_scheme(
                "cron_secret",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(CRON_SECRET_HEADER))),
            );
        }
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health_check,

        crate::api::handlers::entries::list_entries,
        crate::api::handlers::entries::create_entry,
        crate::api::handlers::entries::get_entry,
        crate::api::handlers::entries::update_entry,
        crate::api::handlers::entries::delete_entry,

        crate::api::handlers::medications::list_medications,
        crate::api::handlers::medications::create_medication,
        crate::api::handlers::medications::update_medication,
        crate::api::handlers::medications::delete_medication,
        crate::api::handlers::medications::list_limits,
        crate::api::handlers::medications::create_limit,
        crate::api::handlers::medications::update_limit,
        crate::api::handlers::medications::delete_limit,
        crate::api::handlers::medications::check_limits,

        crate::api::handlers::reminders::list_reminders,
        crate::api::handlers::reminders::create_reminder,
        crate::api::handlers::reminders::get_reminder,
        crate::api::handlers::reminders::update_reminder,
        crate::api::handlers::reminders::delete_reminder,
        crate::api::handlers::reminders::list_subscriptions,
        crate::api::handlers::reminders::subscribe,
        crate::api::handlers::reminders::unsubscribe,

        crate::api::handlers::weather::get_weather,
        crate::api::handlers::weather::backfill_own,
        crate::api::handlers::statistics::get_statistics,

        crate::api::handlers::assessments::submit_assessment,
        crate::api::handlers::assessments::list_assessments,
        crate::api::handlers::assessments::latest_assessment,

        crate::api::handlers::reports::pdf_report,
        crate::api::handlers::reports::ai_report,

        crate::api::handlers::shares::create_share,
        crate::api::handlers::shares::list_shares,
        crate::api::handlers::shares::revoke_share,
        crate::api::handlers::shares::open_share,
        crate::api::handlers::shares::open_share_pdf,

        crate::api::handlers::consents::list_consents,
        crate::api::handlers::consents::grant_consent,
        crate::api::handlers::consents::withdraw_consent,

        crate::api::handlers::account::export_account,
        crate::api::handlers::account::delete_account,

        crate::api::handlers::cron::run_reminders,
        crate::api::handlers::cron::run_weather_backfill
    ),
    components(
        schemas(
            // API types
            crate::api::error::ErrorResponse,
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentHealthStatus,
            crate::entities::common::PaginatedEntries,
            crate::entities::common::WeatherResponse,

            // Entries and statistics
            migraine_diary_domain::entities::PainEntry,
            migraine_diary_domain::entities::CreateEntryRequest,
            migraine_diary_domain::entities::UpdateEntryRequest,
            migraine_diary_domain::entities::EntryStatistics,
            migraine_diary_domain::entities::SampleTier,
            migraine_diary_domain::entities::statistics::CountItem,
            migraine_diary_domain::entities::statistics::WeekdayPain,
            migraine_diary_domain::entities::statistics::PressureTrend,
            migraine_diary_domain::entities::statistics::PressureBucket,
            migraine_diary_domain::entities::statistics::WeatherCorrelation,
            migraine_diary_domain::entities::statistics::SeverityDistribution,
            migraine_diary_domain::entities::statistics::MeCfsSummary,

            // Medications
            migraine_diary_domain::entities::medication::UserMedication,
            migraine_diary_domain::entities::medication::CreateMedicationRequest,
            migraine_diary_domain::entities::medication::UpdateMedicationRequest,
            migraine_diary_domain::entities::medication::MedicationLimit,
            migraine_diary_domain::entities::medication::LimitPeriod,
            migraine_diary_domain::entities::medication::CreateLimitRequest,
            migraine_diary_domain::entities::medication::UpdateLimitRequest,
            migraine_diary_domain::entities::medication::LimitCheckRequest,
            migraine_diary_domain::entities::medication::LimitCheckResult,
            migraine_diary_domain::entities::medication::LimitStatus,

            // Reminders and push
            migraine_diary_domain::entities::reminder::Reminder,
            migraine_diary_domain::entities::reminder::ReminderKind,
            migraine_diary_domain::entities::reminder::ReminderStatus,
            migraine_diary_domain::entities::reminder::RepeatInterval,
            migraine_diary_domain::entities::reminder::CreateReminderRequest,
            migraine_diary_domain::entities::reminder::UpdateReminderRequest,
            migraine_diary_domain::entities::reminder::PushSubscription,
            migraine_diary_domain::entities::reminder::CreatePushSubscriptionRequest,
            migraine_diary_domain::entities::reminder::ReminderRunReport,

            // Weather
            migraine_diary_domain::entities::WeatherLog,
            migraine_diary_domain::entities::BackfillReport,

            // Assessments
            migraine_diary_domain::entities::Hit6Request,
            migraine_diary_domain::entities::Hit6Result,
            migraine_diary_domain::entities::Hit6Category,
            migraine_diary_domain::entities::assessment::Hit6Assessment,

            // Reports, shares, consents, account
            migraine_diary_domain::entities::AiReport,
            migraine_diary_domain::entities::AiReportRequest,
            migraine_diary_domain::entities::DoctorShare,
            migraine_diary_domain::entities::CreateShareRequest,
            migraine_diary_domain::entities::SharedDiary,
            migraine_diary_domain::entities::ConsentType,
            migraine_diary_domain::entities::UserConsent,
            migraine_diary_domain::entities::GrantConsentRequest,
            migraine_diary_domain::entities::AccountExport,
            migraine_diary_domain::entities::DeletionReport,

            migraine_diary_domain::auth::Claims
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "entries", description = "Pain diary entries"),
        (name = "medications", description = "Saved medications and intake limits"),
        (name = "reminders", description = "Medication and appointment reminders, push devices"),
        (name = "weather", description = "Weather observations linked to entries"),
        (name = "statistics", description = "Aggregates over diary entries"),
        (name = "assessments", description = "HIT-6 headache impact questionnaire"),
        (name = "reports", description = "PDF and AI-generated reports"),
        (name = "shares", description = "Time-limited physician access"),
        (name = "consents", description = "Processing consents"),
        (name = "account", description = "Data export and erasure"),
        (name = "cron", description = "Hooks for an external scheduler")
    ),
    info(
        title = "Migraine Diary API",
        version = "0.1.0",
        description = "API for logging migraine and pain episodes and sharing them with physicians",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;
