use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::Utc;
use tracing::{info, instrument};

use migraine_diary_domain::entities::{BackfillReport, ReminderRunReport};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::AppState;
use crate::entities::common::BackfillParams;

/// Deliver due reminders; called by an external scheduler
#[utoipa::path(
    post,
    path = "/cron/reminders",
    responses(
        (status = 200, description = "Run outcome", body = ReminderRunReport),
        (status = 401, description = "Missing or wrong cron secret", body = ErrorResponse),
    ),
    security(("cron_secret" = [])),
    tag = "cron"
)]
#[instrument(skip(state))]
pub async fn run_reminders(State(state): State<AppState>) -> ApiResult<Json<ReminderRunReport>> {
    let report = state.reminders.process_due(Utc::now()).await?;
    info!("Cron reminder run: {} claimed, {} sent", report.claimed, report.sent);
    Ok(Json(report))
}

/// Link weather to one batch of entries across all users
#[utoipa::path(
    post,
    path = "/cron/weather-backfill",
    params(BackfillParams),
    responses(
        (status = 200, description = "Batch outcome", body = BackfillReport),
        (status = 401, description = "Missing or wrong cron secret", body = ErrorResponse),
    ),
    security(("cron_secret" = [])),
    tag = "cron"
)]
#[instrument(skip(state))]
pub async fn run_weather_backfill(
    State(state): State<AppState>,
    params: Result<Query<BackfillParams>, QueryRejection>,
) -> ApiResult<Json<BackfillReport>> {
    let Query(params) = params?;
    let report = state.weather.backfill(params.user_id.as_deref()).await?;
    info!("Cron weather backfill: {} of {} processed", report.processed, report.selected);
    Ok(Json(report))
}
