use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use tracing::instrument;

use migraine_diary_domain::auth::AuthUser;
use migraine_diary_domain::entities::{
    CreateLimitRequest, CreateMedicationRequest, LimitCheckRequest, LimitCheckResult, MedicationLimit,
    UpdateLimitRequest, UpdateMedicationRequest, UserMedication,
};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/medications",
    responses((status = 200, description = "Saved medications", body = Vec<UserMedication>)),
    security(("bearer" = [])),
    tag = "medications"
)]
pub async fn list_medications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<UserMedication>>> {
    Ok(Json(state.medications.list(&user.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/medications",
    request_body = CreateMedicationRequest,
    responses(
        (status = 201, description = "Medication saved", body = UserMedication),
        (status = 400, description = "Invalid medication", body = ErrorResponse),
        (status = 409, description = "Medication already saved", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "medications"
)]
#[instrument(skip(state, user, payload))]
pub async fn create_medication(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateMedicationRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let medication = state.medications.create(&user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(medication)))
}

#[utoipa::path(
    put,
    path = "/api/v1/medications/{id}",
    params(("id" = String, Path, description = "Medication ID")),
    request_body = UpdateMedicationRequest,
    responses(
        (status = 200, description = "Medication updated", body = UserMedication),
        (status = 404, description = "Medication not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "medications"
)]
pub async fn update_medication(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMedicationRequest>, JsonRejection>,
) -> ApiResult<Json<UserMedication>> {
    let Json(request) = payload?;
    Ok(Json(state.medications.update(&user.user_id, &id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/medications/{id}",
    params(("id" = String, Path, description = "Medication ID")),
    responses(
        (status = 204, description = "Medication deleted"),
        (status = 404, description = "Medication not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "medications"
)]
pub async fn delete_medication(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.medications.delete(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/medication-limits",
    responses((status = 200, description = "Configured limits", body = Vec<MedicationLimit>)),
    security(("bearer" = [])),
    tag = "medications"
)]
pub async fn list_limits(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<MedicationLimit>>> {
    Ok(Json(state.limits.list(&user.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/medication-limits",
    request_body = CreateLimitRequest,
    responses(
        (status = 201, description = "Limit created", body = MedicationLimit),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
        (status = 409, description = "Limit already exists for this medication and period", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "medications"
)]
#[instrument(skip(state, user, payload))]
pub async fn create_limit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateLimitRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let limit = state.limits.create(&user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(limit)))
}

#[utoipa::path(
    put,
    path = "/api/v1/medication-limits/{id}",
    params(("id" = String, Path, description = "Limit ID")),
    request_body = UpdateLimitRequest,
    responses(
        (status = 200, description = "Limit updated", body = MedicationLimit),
        (status = 404, description = "Limit not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "medications"
)]
pub async fn update_limit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateLimitRequest>, JsonRejection>,
) -> ApiResult<Json<MedicationLimit>> {
    let Json(request) = payload?;
    Ok(Json(state.limits.update(&user.user_id, &id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/medication-limits/{id}",
    params(("id" = String, Path, description = "Limit ID")),
    responses(
        (status = 204, description = "Limit deleted"),
        (status = 404, description = "Limit not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "medications"
)]
pub async fn delete_limit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.limits.delete(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Intake counts against each active limit in its rolling window
#[utoipa::path(
    post,
    path = "/api/v1/medication-limits/check",
    request_body = LimitCheckRequest,
    responses((status = 200, description = "Usage per limit", body = Vec<LimitCheckResult>)),
    security(("bearer" = [])),
    tag = "medications"
)]
#[instrument(skip(state, user, payload))]
pub async fn check_limits(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<LimitCheckRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<LimitCheckResult>>> {
    let Json(request) = payload?;
    Ok(Json(state.limits.check(&user.user_id, &request, Utc::now()).await?))
}
