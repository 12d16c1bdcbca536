use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use migraine_diary_domain::auth::{auth_middleware, configure_auth, cron_guard};

use crate::api::handlers::{
    account, assessments, consents, cron, entries, health, medications, reminders, reports, shares, statistics,
    weather,
};
use crate::api::state::AppState;
use crate::openapi::configure_swagger_routes;

/// Create the application router
pub fn create_app(state: AppState) -> Router {
    debug!("Creating application router");

    // Routes that require a bearer token
    let api_routes = Router::new()
        .route("/entries", get(entries::list_entries).post(entries::create_entry))
        .route(
            "/entries/:id",
            get(entries::get_entry).put(entries::update_entry).delete(entries::delete_entry),
        )
        .route(
            "/medications",
            get(medications::list_medications).post(medications::create_medication),
        )
        .route(
            "/medications/:id",
            put(medications::update_medication).delete(medications::delete_medication),
        )
        // Define specific routes before parametrized routes to avoid conflicts
        .route("/medication-limits/check", post(medications::check_limits))
        .route(
            "/medication-limits",
            get(medications::list_limits).post(medications::create_limit),
        )
        .route(
            "/medication-limits/:id",
            put(medications::update_limit).delete(medications::delete_limit),
        )
        .route("/reminders", get(reminders::list_reminders).post(reminders::create_reminder))
        .route(
            "/reminders/:id",
            get(reminders::get_reminder)
                .put(reminders::update_reminder)
                .delete(reminders::delete_reminder),
        )
        .route(
            "/push-subscriptions",
            get(reminders::list_subscriptions).post(reminders::subscribe),
        )
        .route("/push-subscriptions/:id", delete(reminders::unsubscribe))
        .route("/weather", get(weather::get_weather))
        .route("/weather/backfill", post(weather::backfill_own))
        .route("/statistics", get(statistics::get_statistics))
        .route("/assessments/latest", get(assessments::latest_assessment))
        .route(
            "/assessments",
            get(assessments::list_assessments).post(assessments::submit_assessment),
        )
        .route("/reports/pdf", get(reports::pdf_report))
        .route("/reports/ai", post(reports::ai_report))
        .route("/shares", get(shares::list_shares).post(shares::create_share))
        .route("/shares/:id", delete(shares::revoke_share))
        .route("/consents", get(consents::list_consents).post(consents::grant_consent))
        .route("/consents/:consent_type", delete(consents::withdraw_consent))
        .route("/account/export", get(account::export_account))
        .route("/account", delete(account::delete_account))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware::<AppState>));

    debug!("API routes configured");

    // External scheduler hooks, guarded by the shared secret
    let cron_routes = Router::new()
        .route("/cron/reminders", post(cron::run_reminders))
        .route("/cron/weather-backfill", post(cron::run_weather_backfill))
        .layer(middleware::from_fn_with_state(state.cron_secret.clone(), cron_guard));

    // Routes that don't require authentication
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/share/:code", get(shares::open_share))
        .route("/share/:code/pdf", get(shares::open_share_pdf));

    let app = Router::new()
        .merge(public_routes)
        .merge(cron_routes)
        .nest("/api/v1", api_routes)
        .with_state(state)
        .merge(configure_swagger_routes())
        .layer(TraceLayer::new_for_http());

    let app = configure_auth(app);
    debug!("Security configuration applied");

    health::initialize_server_start_time();

    app
}
