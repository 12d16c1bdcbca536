use axum::{extract::State, Extension, Json};
use tracing::{info, instrument};

use migraine_diary_domain::auth::AuthUser;
use migraine_diary_domain::entities::{AccountExport, DeletionReport};

use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// Everything stored about the caller, as one JSON document
#[utoipa::path(
    get,
    path = "/api/v1/account/export",
    responses((status = 200, description = "Full data export", body = AccountExport)),
    security(("bearer" = [])),
    tag = "account"
)]
#[instrument(skip(state, user))]
pub async fn export_account(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<AccountExport>> {
    Ok(Json(state.account.export(&user.user_id).await?))
}

/// Erase every row owned by the caller
#[utoipa::path(
    delete,
    path = "/api/v1/account",
    responses((status = 200, description = "Rows removed per table", body = DeletionReport)),
    security(("bearer" = [])),
    tag = "account"
)]
#[instrument(skip(state, user))]
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<DeletionReport>> {
    let report = state.account.delete_all(&user.user_id).await?;
    info!("Account data erased ({} rows)", report.total);
    Ok(Json(report))
}
