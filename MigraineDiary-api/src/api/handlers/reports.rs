use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use tracing::{info, instrument};

use migraine_diary_domain::auth::AuthUser;
use migraine_diary_domain::entities::{AiReport, AiReportRequest, ReportQuery};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::AppState;
use crate::entities::common::ReportParams;

/// PDF body with a download filename
pub(crate) fn pdf_response(bytes: Vec<u8>, filename: &str) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        bytes,
    )
}

/// Printable diary for a physician visit
#[utoipa::path(
    get,
    path = "/api/v1/reports/pdf",
    params(ReportParams),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf"),
        (status = 400, description = "Invalid range", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reports"
)]
#[instrument(skip(state, user))]
pub async fn pdf_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<ReportParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params?;
    let now = Utc::now();
    let bytes = state.reports.render(&user.user_id, &ReportQuery::from(params), now).await?;
    info!("Rendered PDF report ({} bytes)", bytes.len());
    Ok(pdf_response(bytes, &format!("migraine-report-{}.pdf", now.format("%Y-%m-%d"))))
}

/// Narrative analysis from the LLM gateway; requires the ai_analysis consent
#[utoipa::path(
    post,
    path = "/api/v1/reports/ai",
    request_body = AiReportRequest,
    responses(
        (status = 200, description = "Generated report", body = AiReport),
        (status = 400, description = "No entries in range", body = ErrorResponse),
        (status = 402, description = "Provider out of credits", body = ErrorResponse),
        (status = 403, description = "Consent missing", body = ErrorResponse),
        (status = 429, description = "Provider rate limit", body = ErrorResponse),
        (status = 503, description = "AI analysis not configured", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reports"
)]
#[instrument(skip(state, user, payload))]
pub async fn ai_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<AiReportRequest>, JsonRejection>,
) -> ApiResult<Json<AiReport>> {
    let Json(request) = payload?;
    Ok(Json(state.ai_reports.generate(&user.user_id, request, Utc::now()).await?))
}
