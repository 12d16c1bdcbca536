use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use tracing::{info, instrument};

use migraine_diary_domain::auth::AuthUser;
use migraine_diary_domain::entities::{CreateShareRequest, DoctorShare, SharedDiary};

use super::reports::pdf_response;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::AppState;

/// Create a time-limited access code for a physician
#[utoipa::path(
    post,
    path = "/api/v1/shares",
    request_body = CreateShareRequest,
    responses(
        (status = 201, description = "Share created", body = DoctorShare),
        (status = 400, description = "Invalid range or lifetime", body = ErrorResponse),
        (status = 403, description = "Doctor sharing consent missing", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "shares"
)]
#[instrument(skip(state, user, payload))]
pub async fn create_share(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateShareRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let share = state.shares.create(&user.user_id, request, Utc::now()).await?;
    info!("Share {} created, expires at {}", share.id, share.expires_at);
    Ok((StatusCode::CREATED, Json(share)))
}

#[utoipa::path(
    get,
    path = "/api/v1/shares",
    responses((status = 200, description = "Shares, newest first", body = Vec<DoctorShare>)),
    security(("bearer" = [])),
    tag = "shares"
)]
pub async fn list_shares(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<DoctorShare>>> {
    Ok(Json(state.shares.list(&user.user_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/shares/{id}",
    params(("id" = String, Path, description = "Share ID")),
    responses(
        (status = 204, description = "Share revoked"),
        (status = 404, description = "Share not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "shares"
)]
#[instrument(skip(state, user))]
pub async fn revoke_share(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.shares.revoke(&user.user_id, &id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Physician view of a shared diary; no login, the code is the credential
#[utoipa::path(
    get,
    path = "/share/{code}",
    params(("code" = String, Path, description = "Access code")),
    responses(
        (status = 200, description = "Shared diary", body = SharedDiary),
        (status = 404, description = "Unknown, expired or revoked code", body = ErrorResponse),
    ),
    tag = "shares"
)]
#[instrument(skip(state, code))]
pub async fn open_share(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<Json<SharedDiary>> {
    let (_, diary) = state.shares.open(&code, Utc::now()).await?;
    Ok(Json(diary))
}

#[utoipa::path(
    get,
    path = "/share/{code}/pdf",
    params(("code" = String, Path, description = "Access code")),
    responses(
        (status = 200, description = "PDF of the shared diary", content_type = "application/pdf"),
        (status = 404, description = "Unknown, expired or revoked code", body = ErrorResponse),
    ),
    tag = "shares"
)]
#[instrument(skip(state, code))]
pub async fn open_share_pdf(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<impl IntoResponse> {
    let (share, diary) = state.shares.open(&code, Utc::now()).await?;
    let bytes = state.reports.render_shared(&diary)?;
    Ok(pdf_response(bytes, &format!("shared-diary-{}.pdf", share.from_date)))
}
