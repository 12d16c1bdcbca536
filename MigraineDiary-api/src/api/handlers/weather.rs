use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use chrono::Utc;
use tracing::instrument;

use migraine_diary_domain::auth::AuthUser;
use migraine_diary_domain::entities::BackfillReport;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::AppState;
use crate::entities::common::{WeatherParams, WeatherResponse};

/// Weather at a place and time, served from the cache when possible
#[utoipa::path(
    get,
    path = "/api/v1/weather",
    params(WeatherParams),
    responses(
        (status = 200, description = "Observation for the hour", body = WeatherResponse),
        (status = 400, description = "Coordinates out of range", body = ErrorResponse),
        (status = 502, description = "Weather provider failed", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "weather"
)]
#[instrument(skip(state, _user))]
pub async fn get_weather(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    params: Result<Query<WeatherParams>, QueryRejection>,
) -> ApiResult<Json<WeatherResponse>> {
    let Query(params) = params?;
    let at = params.at.unwrap_or_else(Utc::now);
    let (observation, cached) = state
        .weather
        .observation_for(params.latitude, params.longitude, at)
        .await?;
    Ok(Json(WeatherResponse { observation, cached }))
}

/// Link weather to the caller's entries that still lack it
#[utoipa::path(
    post,
    path = "/api/v1/weather/backfill",
    responses((status = 200, description = "Batch outcome", body = BackfillReport)),
    security(("bearer" = [])),
    tag = "weather"
)]
#[instrument(skip(state, user))]
pub async fn backfill_own(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<BackfillReport>> {
    Ok(Json(state.weather.backfill(Some(&user.user_id)).await?))
}
