use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument};

use migraine_diary_domain::auth::AuthUser;
use migraine_diary_domain::entities::{CreateEntryRequest, EntryQuery, PainEntry, UpdateEntryRequest};
use migraine_diary_domain::services::entries::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::AppState;
use crate::entities::common::{EntryListParams, PaginatedEntries, PaginatedResponse};

/// List pain entries in a date window
#[utoipa::path(
    get,
    path = "/api/v1/entries",
    params(EntryListParams),
    responses(
        (status = 200, description = "Entries in the window", body = PaginatedEntries),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "entries"
)]
#[instrument(skip(state, user))]
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<EntryListParams>, QueryRejection>,
) -> ApiResult<Json<PaginatedResponse<PainEntry>>> {
    let Query(params) = params?;
    let query = EntryQuery::from(params);
    let (data, total) = state.entries.list_entries(&user.user_id, &query).await?;

    Ok(Json(PaginatedResponse {
        count: data.len(),
        total,
        offset: query.offset.unwrap_or(0),
        limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT),
        data,
    }))
}

/// Log a new pain entry
#[utoipa::path(
    post,
    path = "/api/v1/entries",
    request_body = CreateEntryRequest,
    responses(
        (status = 201, description = "Entry created", body = PainEntry),
        (status = 400, description = "Invalid entry", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "entries"
)]
#[instrument(skip(state, user, payload))]
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateEntryRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let entry = state.entries.create_entry(&user.user_id, request).await?;
    info!("Pain entry created with ID: {}", entry.id);
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    get,
    path = "/api/v1/entries/{id}",
    params(("id" = String, Path, description = "Entry ID")),
    responses(
        (status = 200, description = "Entry found", body = PainEntry),
        (status = 404, description = "Entry not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "entries"
)]
pub async fn get_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<PainEntry>> {
    Ok(Json(state.entries.get_entry(&user.user_id, &id).await?))
}

/// Partial update; changing time or place unlinks the weather observation
#[utoipa::path(
    put,
    path = "/api/v1/entries/{id}",
    params(("id" = String, Path, description = "Entry ID")),
    request_body = UpdateEntryRequest,
    responses(
        (status = 200, description = "Entry updated", body = PainEntry),
        (status = 400, description = "Invalid update", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "entries"
)]
#[instrument(skip(state, user, payload))]
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateEntryRequest>, JsonRejection>,
) -> ApiResult<Json<PainEntry>> {
    let Json(request) = payload?;
    Ok(Json(state.entries.update_entry(&user.user_id, &id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/entries/{id}",
    params(("id" = String, Path, description = "Entry ID")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "Entry not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "entries"
)]
#[instrument(skip(state, user))]
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.entries.delete_entry(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
