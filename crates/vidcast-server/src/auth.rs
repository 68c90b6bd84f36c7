//! Access-token gate.
//!
//! Handlers that need an identity take an [`AuthUser`] argument. The token
//! comes from `Authorization: Bearer <token>` or, failing that, the
//! `accessToken` cookie set at login.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use vidcast_shared::constants::ACCESS_TOKEN_COOKIE;
use vidcast_store::{StoreError, User};

use crate::api::AppState;
use crate::error::ServerError;

/// The authenticated caller, re-read from the store on every request.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = request_token(&parts.headers)
            .ok_or_else(|| ServerError::Unauthorized("Missing access token".into()))?;

        let claims = state.signer.verify(&token).map_err(|e| {
            tracing::debug!(error = %e, "rejected access token");
            ServerError::Unauthorized("Invalid access token".into())
        })?;

        let user_id = claims.user_id;
        let user = state
            .store
            .run(move |db| db.get_user(user_id))
            .await
            .map_err(|e| match e {
                ServerError::Store(StoreError::NotFound(_)) => {
                    ServerError::Unauthorized("Invalid access token".into())
                }
                other => other,
            })?;

        Ok(AuthUser(user))
    }
}

fn request_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

/// `Set-Cookie` value carrying a fresh token.
pub fn session_cookie(token: &str, ttl_secs: i64) -> String {
    format!(
        "{ACCESS_TOKEN_COOKIE}={token}; Path=/; HttpOnly; Secure; SameSite=None; Max-Age={ttl_secs}"
    )
}

/// `Set-Cookie` value that expires the session cookie.
pub fn cleared_cookie() -> String {
    format!("{ACCESS_TOKEN_COOKIE}=; Path=/; HttpOnly; Secure; SameSite=None; Max-Age=0")
}
