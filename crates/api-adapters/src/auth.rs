//! Bearer-token authentication.
//!
//! The identity provider's verdict is trusted as-is. A missing, malformed
//! or rejected token ends the request with 401 before any handler runs.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domains::{Account, AppError};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Account);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

        let account = state
            .tokens
            .account_by_token(token)
            .await
            .map_err(AppError::directory)?;

        match account {
            Some(account) => Ok(AuthUser(account)),
            None => {
                debug!("bearer token rejected");
                Err(AppError::Unauthorized("invalid or expired token".into()).into())
            }
        }
    }
}

/// The auth scheme name is case-insensitive.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}
