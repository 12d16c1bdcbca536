//! Authentication module for the MigraineDiary API
//!
//! Provides bearer-token middleware for the diary routes, the shared-secret
//! guard for cron routes and the security headers applied to every response.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::logging::{log_auth_event, AuthEvent, AuthEventType};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

// JWT handling
pub mod token;

// Structured auth event logging
pub mod logging;

/// Header carrying the cron shared secret
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Authentication claims for JSON Web Tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (as timestamp)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Authenticated caller, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

/// Shared secret for the cron routes; `None` rejects every call
#[derive(Debug, Clone, Default)]
pub struct CronSecret(pub Option<String>);

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized", "message": message })),
    )
        .into_response()
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or("Authorization header does not contain Bearer token")
}

/// Authentication middleware for protected routes
pub async fn auth_middleware<S>(_state: State<S>, mut req: Request<Body>, next: Next) -> Response {
    let request_path = req.uri().path().to_string();
    let start_time = std::time::Instant::now();
    let agent = user_agent(req.headers());

    let token = match bearer_token(req.headers()) {
        Ok(token) => token.to_string(),
        Err(reason) => {
            debug!("Rejecting request to {}: {}", request_path, reason);

            let mut event = AuthEvent::new(AuthEventType::TokenValidation, None, false)
                .with_details(reason)
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            if let Some(agent) = agent {
                event = event.with_user_agent(agent);
            }
            log_auth_event(event);

            return unauthorized(reason);
        }
    };

    match token::validate_token(&token) {
        Ok(claims) => {
            let event = AuthEvent::new(AuthEventType::TokenValidation, Some(&claims.sub), true)
                .with_details("JWT validation successful")
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);

            req.extensions_mut().insert(AuthUser {
                user_id: claims.sub.clone(),
            });
            req.extensions_mut().insert(claims);

            next.run(req).await
        }
        Err(e) => {
            warn!("Token validation failed: {}", e);

            let mut event = AuthEvent::new(AuthEventType::TokenValidation, None, false)
                .with_details(e.to_string())
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            if let Some(agent) = agent {
                event = event.with_user_agent(agent);
            }
            log_auth_event(event);

            match e {
                token::SecurityError::TokenExpired => unauthorized("Token has expired"),
                token::SecurityError::ConfigError(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "error": "service_unavailable",
                        "message": "Authentication is not configured"
                    })),
                )
                    .into_response(),
                _ => unauthorized("Invalid token"),
            }
        }
    }
}

/// Compare two secrets without short-circuiting on the first mismatch
fn secrets_match(expected: &str, provided: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();
    if expected.len() != provided.len() {
        return false;
    }
    expected
        .iter()
        .zip(provided)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Guard for cron routes: requires the configured secret in `x-cron-secret`
pub async fn cron_guard(State(secret): State<CronSecret>, req: Request<Body>, next: Next) -> Response {
    let provided = req
        .headers()
        .get(CRON_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    let allowed = match (secret.0.as_deref(), provided) {
        (Some(expected), Some(provided)) => secrets_match(expected, provided),
        _ => false,
    };

    if !allowed {
        let event = AuthEvent::new(AuthEventType::AccessDenied, None, false)
            .with_details(if secret.0.is_none() {
                "Cron secret is not configured"
            } else {
                "Missing or wrong cron secret"
            })
            .with_resource(req.uri().path().to_string())
            .with_auth_method("cron_secret");
        log_auth_event(event);

        return unauthorized("Invalid cron secret");
    }

    next.run(req).await
}

/// Configure CORS and security headers for the application
pub fn configure_auth(app: axum::Router) -> axum::Router {
    use axum::http::{HeaderName, HeaderValue, Method};
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::set_header::SetResponseHeaderLayer;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=(), interest-cohort=()"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    app.layer(cors).layer(security_headers)
}
