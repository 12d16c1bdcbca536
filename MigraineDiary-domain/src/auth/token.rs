use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::env;
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::Claims;

/// Issuer used when `JWT_ISSUER` is not set
pub const DEFAULT_ISSUER: &str = "migraine-diary-api";

/// Security errors for authentication and token operations
#[derive(Debug, Error)]
pub enum SecurityError {
    /// JWT validation error
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    /// Expired token
    #[error("Token has expired")]
    TokenExpired,

    /// Invalid token structure
    #[error("Invalid token format")]
    InvalidToken,

    /// Invalid issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,

    /// Configuration error
    #[error("Security configuration error: {0}")]
    ConfigError(String),
}

fn jwt_secret() -> Result<String, SecurityError> {
    env::var("JWT_SECRET").map_err(|e| {
        error!("JWT_SECRET environment variable not found: {}", e);
        SecurityError::ConfigError("JWT_SECRET environment variable not found".to_string())
    })
}

fn issuer() -> String {
    env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string())
}

/// Lifetime of access tokens, `ACCESS_TOKEN_EXPIRATION_MINUTES` (default 60)
pub fn access_token_lifetime() -> Duration {
    let minutes = env::var("ACCESS_TOKEN_EXPIRATION_MINUTES")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|minutes| *minutes > 0)
        .unwrap_or(60);

    Duration::minutes(minutes)
}

/// Generate a signed access token for `user_id`.
///
/// Sign-in itself is handled by the identity provider; this is used by
/// tooling and tests that need a token the server accepts.
pub fn generate_token(user_id: &str) -> Result<String, SecurityError> {
    let secret = jwt_secret()?;

    let now = Utc::now();
    let expiration = now + access_token_lifetime();

    let claims = Claims {
        sub: user_id.to_string(),
        iss: issuer(),
        iat: now.timestamp(),
        exp: expiration.timestamp(),
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).map_err(|e| {
        error!("Failed to encode JWT token: {}", e);
        SecurityError::TokenValidation(e.to_string())
    })?;

    debug!("Generated access token for user {}, expires {}", user_id, expiration);
    Ok(token)
}

/// Validate a JWT token and return the decoded claims
pub fn validate_token(token: &str) -> Result<Claims, SecurityError> {
    let secret = jwt_secret()?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_issuer(&[issuer()]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation).map_err(
        |e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => SecurityError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                SecurityError::TokenValidation("Invalid signature".to_string())
            }
            _ => SecurityError::TokenValidation(e.to_string()),
        },
    )?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(SecurityError::TokenValidation("Token has no subject".to_string()));
    }

    Ok(token_data.claims)
}
