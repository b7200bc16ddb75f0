//! JWT auth extractors for API routes.
//!
//! Reads the Supabase JWT from the `Authorization: Bearer <token>` header,
//! verifies it with HS256, and loads the caller's roles from the `users`
//! table into an [`AuthContext`].
//!
//! Admin-only routes use the [`RequireAdmin`] extractor to gate access.

use super::AppState;
use crate::{
    core::auth::{AuthContext, load_auth_context},
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Audience Supabase puts on user session tokens.
pub const AUDIENCE: &str = "authenticated";

/// JWT claims from a Supabase-issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject, the auth user id
    pub sub: String,
    /// Audience
    pub aud: String,
    /// Expiry as a Unix timestamp
    pub exp: usize,
}

/// Verifies an HS256 token and returns its claims.
pub fn decode_jwt(token: &str, secret: &str) -> Result<SessionClaims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);
    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "JWT verification failed");
            Error::Unauthorized
        })
}

/// Signs a session token for `user_id` valid for `ttl_secs`.
pub fn issue_jwt(user_id: &str, secret: &str, ttl_secs: i64) -> Result<String> {
    let exp = chrono::Utc::now().timestamp() + ttl_secs;
    let claims = SessionClaims {
        sub: user_id.to_string(),
        aud: AUDIENCE.to_string(),
        exp: usize::try_from(exp).unwrap_or_default(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Config {
        message: format!("Failed to sign token: {e}"),
    })
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Authenticates the request and loads the caller's roles.
pub async fn extract_auth_context(state: &AppState, parts: &Parts) -> Result<AuthContext> {
    let token = bearer_token(parts).ok_or(Error::Unauthorized)?;
    let claims = decode_jwt(token, &state.jwt_secret)?;
    load_auth_context(&state.db, &claims.sub).await
}

/// Axum extractor that requires any authenticated user.
///
/// Returns 401 if no valid JWT is present.
pub struct RequireAuth(pub AuthContext);

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        extract_auth_context(state, parts).await.map(Self)
    }
}

/// Axum extractor that requires an authenticated admin user.
///
/// Returns 401 if no valid JWT is present, 403 if the user is not an admin.
pub struct RequireAdmin(pub AuthContext);

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let ctx = extract_auth_context(state, parts).await?;
        ctx.require_admin()?;
        Ok(Self(ctx))
    }
}
