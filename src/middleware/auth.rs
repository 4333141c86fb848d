// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.
//!
//! Tokens are issued by the managed auth provider and signed HS256 with its
//! JWT secret. This service only verifies them.

use crate::error::AppError;
use crate::models::{Role, UserStatus};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (auth provider user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Authenticated, active user with a profile row.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
    pub area_id: Option<i64>,
    pub email: Option<String>,
}

/// Verified token claims without a profile lookup (setup only).
#[derive(Debug, Clone)]
pub struct TokenUser {
    pub id: String,
    pub email: Option<String>,
}

fn bearer_token(request: &Request) -> Result<&str, AppError> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// Verify signature and expiry.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::SessionExpired,
            _ => {
                tracing::debug!(error = %e, "Rejected bearer token");
                AppError::InvalidToken
            }
        })
}

/// Middleware that requires a valid token AND an active profile.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = verify_token(bearer_token(&request)?, &state.config.jwt_secret)?;

    let user = state
        .db
        .get_user(&claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if user.status != UserStatus::Active {
        tracing::info!(user_id = %user.id, status = %user.status, "Inactive account rejected");
        return Err(AppError::Forbidden("Account is not active".to_string()));
    }

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        role: user.role,
        area_id: user.area_id,
        email: claims.email.or(Some(user.email)),
    });

    Ok(next.run(request).await)
}

/// Middleware that only requires a valid token.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = verify_token(bearer_token(&request)?, &state.config.jwt_secret)?;
    request.extensions_mut().insert(TokenUser {
        id: claims.sub,
        email: claims.email,
    });
    Ok(next.run(request).await)
}

/// Create a token the way the auth provider does (tests and local tooling).
pub fn create_jwt(
    subject: &str,
    email: Option<&str>,
    ttl_secs: i64,
    secret: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
    let claims = Claims {
        sub: subject.to_string(),
        iat: now as usize,
        exp: (now + ttl_secs).max(0) as usize,
        email: email.map(str::to_string),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn test_valid_token_round_trips_claims() {
        let token = create_jwt("u1", Some("ana@example.org"), 3600, SECRET).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email.as_deref(), Some("ana@example.org"));
    }

    #[test]
    fn test_expired_token_is_session_expired() {
        // Past the default 60 s leeway.
        let token = create_jwt("u1", None, -3600, SECRET).unwrap();
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(AppError::SessionExpired)
        ));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_jwt("u1", None, 3600, SECRET).unwrap();
        assert!(matches!(
            verify_token(&token, b"other"),
            Err(AppError::InvalidToken)
        ));
    }
}
