use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::instrument;

use migraine_diary_domain::auth::AuthUser;
use migraine_diary_domain::entities::{ConsentType, GrantConsentRequest, UserConsent};
use migraine_diary_domain::services::ServiceError;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/consents",
    responses((status = 200, description = "Consent history including withdrawn grants", body = Vec<UserConsent>)),
    security(("bearer" = [])),
    tag = "consents"
)]
pub async fn list_consents(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<UserConsent>>> {
    Ok(Json(state.consents.list(&user.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/consents",
    request_body = GrantConsentRequest,
    responses(
        (status = 201, description = "Consent granted", body = UserConsent),
        (status = 400, description = "Invalid consent", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "consents"
)]
#[instrument(skip(state, user, payload))]
pub async fn grant_consent(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<GrantConsentRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let consent = state.consents.grant(&user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(consent)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/consents/{consent_type}",
    params(("consent_type" = String, Path, description = "health_data, ai_analysis or doctor_sharing")),
    responses(
        (status = 204, description = "Consent withdrawn"),
        (status = 400, description = "Unknown consent type", body = ErrorResponse),
        (status = 404, description = "No active consent of this type", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "consents"
)]
#[instrument(skip(state, user))]
pub async fn withdraw_consent(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(consent_type): Path<String>,
) -> ApiResult<StatusCode> {
    let consent_type = consent_type
        .parse::<ConsentType>()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;
    state.consents.withdraw(&user.user_id, consent_type).await?;
    Ok(StatusCode::NO_CONTENT)
}
