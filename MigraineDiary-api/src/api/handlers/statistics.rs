use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use chrono::Utc;
use tracing::instrument;

use migraine_diary_domain::auth::AuthUser;
use migraine_diary_domain::entities::{EntryStatistics, StatisticsQuery};
use migraine_diary_domain::services::EntryService;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::AppState;
use crate::entities::common::RangeParams;

/// Aggregates over a window (default: the last 30 days)
#[utoipa::path(
    get,
    path = "/api/v1/statistics",
    params(RangeParams),
    responses(
        (status = 200, description = "Statistics for the window", body = EntryStatistics),
        (status = 400, description = "Invalid range", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "statistics"
)]
#[instrument(skip(state, user))]
pub async fn get_statistics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> ApiResult<Json<EntryStatistics>> {
    let Query(params) = params?;
    let query = StatisticsQuery::from(params);
    let (from, to) = EntryService::resolve_window(query.from, query.to, Utc::now())?;
    Ok(Json(state.statistics.for_range(&user.user_id, from, to).await?))
}
