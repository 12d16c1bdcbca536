use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument};

use migraine_diary_domain::auth::AuthUser;
use migraine_diary_domain::entities::{
    CreatePushSubscriptionRequest, CreateReminderRequest, PushSubscription, Reminder, UpdateReminderRequest,
};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::AppState;
use crate::entities::common::ReminderListParams;

#[utoipa::path(
    get,
    path = "/api/v1/reminders",
    params(ReminderListParams),
    responses((status = 200, description = "Reminders ordered by due time", body = Vec<Reminder>)),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn list_reminders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<ReminderListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Reminder>>> {
    let Query(params) = params?;
    Ok(Json(state.reminders.list(&user.user_id, params.status).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/reminders",
    request_body = CreateReminderRequest,
    responses(
        (status = 201, description = "Reminder scheduled", body = Reminder),
        (status = 400, description = "Invalid reminder", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
#[instrument(skip(state, user, payload))]
pub async fn create_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateReminderRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let reminder = state.reminders.create(&user.user_id, request).await?;
    info!("Reminder {} scheduled for {}", reminder.id, reminder.date_time);
    Ok((StatusCode::CREATED, Json(reminder)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reminders/{id}",
    params(("id" = String, Path, description = "Reminder ID")),
    responses(
        (status = 200, description = "Reminder found", body = Reminder),
        (status = 404, description = "Reminder not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn get_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Reminder>> {
    Ok(Json(state.reminders.get(&user.user_id, &id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/reminders/{id}",
    params(("id" = String, Path, description = "Reminder ID")),
    request_body = UpdateReminderRequest,
    responses(
        (status = 200, description = "Reminder updated", body = Reminder),
        (status = 404, description = "Reminder not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn update_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateReminderRequest>, JsonRejection>,
) -> ApiResult<Json<Reminder>> {
    let Json(request) = payload?;
    Ok(Json(state.reminders.update(&user.user_id, &id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reminders/{id}",
    params(("id" = String, Path, description = "Reminder ID")),
    responses(
        (status = 204, description = "Reminder deleted"),
        (status = 404, description = "Reminder not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn delete_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.reminders.delete(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/push-subscriptions",
    responses((status = 200, description = "Registered devices", body = Vec<PushSubscription>)),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<PushSubscription>>> {
    Ok(Json(state.reminders.list_subscriptions(&user.user_id).await?))
}

/// Register a device; registering a known endpoint again is a no-op
#[utoipa::path(
    post,
    path = "/api/v1/push-subscriptions",
    request_body = CreatePushSubscriptionRequest,
    responses(
        (status = 201, description = "Device registered", body = PushSubscription),
        (status = 400, description = "Invalid endpoint", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
#[instrument(skip(state, user, payload))]
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreatePushSubscriptionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let subscription = state.reminders.subscribe(&user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/push-subscriptions/{id}",
    params(("id" = String, Path, description = "Subscription ID")),
    responses(
        (status = 204, description = "Device removed"),
        (status = 404, description = "Subscription not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.reminders.unsubscribe(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
