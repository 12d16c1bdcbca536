use std::collections::BTreeMap;
use std::sync::Once;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use migraine_diary_domain::health::{ComponentStatus as DomainComponentStatus, SystemStatus};

use crate::api::state::AppState;

/// Health check response with version, uptime and per-component status
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Current service status ("ok", "degraded", or "error")
    pub status: String,
    /// Current application version from Cargo manifest
    pub version: String,
    /// Timestamp of when the response was generated
    pub timestamp: u64,
    /// Uptime of the service in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    /// Status keyed by component name ("database", "llm")
    pub components: BTreeMap<String, ComponentHealthStatus>,
    /// Environment information
    pub environment: String,
}

/// Health status for an individual component
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ComponentHealthStatus {
    /// Status of the component ("ok", "degraded", or "error")
    pub status: String,
    /// Optional message with more details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

static SERVER_START_TIME: OnceCell<u64> = OnceCell::new();
static INIT: Once = Once::new();

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn initialize_server_start_time() {
    INIT.call_once(|| {
        let _ = SERVER_START_TIME.set(unix_now());
    });
}

/// Health check endpoint to verify the API and its database are up
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API is healthy", body = HealthResponse),
        (status = 500, description = "API is not healthy", body = HealthResponse),
        (status = 503, description = "API is degraded", body = HealthResponse)
    ),
    tag = "health"
)]
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");

    let now = unix_now();
    let uptime = SERVER_START_TIME.get().map(|&start_time| now.saturating_sub(start_time));
    let system_health = state.health.get_system_health().await;

    let components = system_health
        .components
        .iter()
        .map(|(name, component)| {
            (
                name.clone(),
                ComponentHealthStatus {
                    status: map_component_status(&component.status).to_string(),
                    message: component.details.clone(),
                },
            )
        })
        .collect();

    let (code, status) = match system_health.status {
        SystemStatus::Healthy => (StatusCode::OK, "ok"),
        SystemStatus::Degraded => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
        SystemStatus::Unhealthy => (StatusCode::INTERNAL_SERVER_ERROR, "error"),
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: now,
        uptime,
        components,
        environment: state.environment.clone(),
    };

    (code, Json(response))
}

fn map_component_status(status: &DomainComponentStatus) -> &'static str {
    match status {
        DomainComponentStatus::Healthy => "ok",
        DomainComponentStatus::Degraded => "degraded",
        DomainComponentStatus::Unhealthy => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_status_strings() {
        assert_eq!(map_component_status(&DomainComponentStatus::Healthy), "ok");
        assert_eq!(map_component_status(&DomainComponentStatus::Degraded), "degraded");
        assert_eq!(map_component_status(&DomainComponentStatus::Unhealthy), "error");
    }

    #[test]
    fn test_start_time_is_set_once() {
        initialize_server_start_time();
        let first = SERVER_START_TIME.get().copied();
        initialize_server_start_time();
        assert!(first.is_some());
        assert_eq!(SERVER_START_TIME.get().copied(), first);
    }
}
