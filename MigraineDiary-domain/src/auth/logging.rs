use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Types of authentication events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthEventType {
    /// Bearer token check on a protected route
    TokenValidation,
    /// Cron endpoint called with a missing or wrong secret
    AccessDenied,
    /// Physician opened a doctor share by code
    ShareAccess,
    /// Account export or erasure
    DataRequest,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEventType::TokenValidation => write!(f, "TOKEN_VALIDATION"),
            AuthEventType::AccessDenied => write!(f, "ACCESS_DENIED"),
            AuthEventType::ShareAccess => write!(f, "SHARE_ACCESS"),
            AuthEventType::DataRequest => write!(f, "DATA_REQUEST"),
        }
    }
}

/// Authentication event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    /// Type of authentication event
    pub event_type: AuthEventType,
    /// User ID (if available)
    pub user_id: Option<String>,
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    /// User agent string from the client
    pub user_agent: Option<String>,
    /// Whether the event was successful
    pub success: bool,
    /// Additional details about the event
    pub details: Option<String>,
    /// The resource being accessed (if applicable)
    pub resource: Option<String>,
    /// Duration of the operation in milliseconds (if applicable)
    pub duration_ms: Option<u64>,
    /// Authentication method used (jwt, cron_secret, share_code)
    pub auth_method: Option<String>,
}

impl AuthEvent {
    /// Create a new authentication event
    pub fn new(event_type: AuthEventType, user_id: Option<&str>, success: bool) -> Self {
        Self {
            event_type,
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            user_agent: None,
            success,
            details: None,
            resource: None,
            duration_ms: None,
            auth_method: None,
        }
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the resource
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the duration
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Set the authentication method
    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }
}

/// Log an authentication event under the `auth_events` target
pub fn log_auth_event(event: AuthEvent) {
    let user_id = event.user_id.as_deref().unwrap_or("anonymous");
    let status = if event.success { "SUCCESS" } else { "FAILURE" };
    let details = event.details.as_deref().unwrap_or("");

    if event.success {
        info!(
            target: "auth_events",
            event_type = %event.event_type,
            user_id,
            resource = event.resource.as_deref(),
            duration_ms = event.duration_ms,
            auth_method = event.auth_method.as_deref(),
            user_agent = event.user_agent.as_deref(),
            "AUTH-LOG [{}] [{}] [{}] {}",
            event.event_type,
            user_id,
            status,
            details
        );
    } else {
        warn!(
            target: "auth_events",
            event_type = %event.event_type,
            user_id,
            resource = event.resource.as_deref(),
            duration_ms = event.duration_ms,
            auth_method = event.auth_method.as_deref(),
            user_agent = event.user_agent.as_deref(),
            "AUTH-LOG [{}] [{}] [{}] {}",
            event.event_type,
            user_id,
            status,
            details
        );
    }
}

/// Log a physician opening a share. The code itself is never logged.
pub fn log_share_access(owner_id: Option<&str>, success: bool, details: &str) {
    let event = AuthEvent::new(AuthEventType::ShareAccess, owner_id, success)
        .with_details(details)
        .with_auth_method("share_code");

    log_auth_event(event);
}

/// Log an export or erasure of a user's data
pub fn log_account_event(user_id: &str, action: &str, details: &str) {
    let event = AuthEvent::new(AuthEventType::DataRequest, Some(user_id), true)
        .with_resource(action)
        .with_details(details)
        .with_auth_method("jwt");

    log_auth_event(event);
}
