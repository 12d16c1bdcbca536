use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::instrument;

use migraine_diary_domain::auth::AuthUser;
use migraine_diary_domain::entities::{Hit6Request, Hit6Result};
use migraine_diary_domain::services::ServiceError;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::AppState;
use crate::entities::common::AssessmentListParams;

/// Score and store a HIT-6 questionnaire
#[utoipa::path(
    post,
    path = "/api/v1/assessments",
    request_body = Hit6Request,
    responses(
        (status = 201, description = "Assessment scored", body = Hit6Result),
        (status = 400, description = "Invalid answers", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "assessments"
)]
#[instrument(skip(state, user, payload))]
pub async fn submit_assessment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<Hit6Request>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let result = state.assessments.submit(&user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/assessments",
    params(AssessmentListParams),
    responses((status = 200, description = "Assessments, newest first", body = Vec<Hit6Result>)),
    security(("bearer" = [])),
    tag = "assessments"
)]
pub async fn list_assessments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<AssessmentListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Hit6Result>>> {
    let Query(params) = params?;
    Ok(Json(state.assessments.list(&user.user_id, params.limit).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/assessments/latest",
    responses(
        (status = 200, description = "Most recent assessment", body = Hit6Result),
        (status = 404, description = "No assessment yet", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "assessments"
)]
pub async fn latest_assessment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Hit6Result>> {
    state
        .assessments
        .latest(&user.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound("No assessment recorded yet".to_string()).into())
}
