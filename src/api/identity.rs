//! Acting-user resolution.

use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::types::{User, UserId};
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts on behalf of.
#[derive(Debug, Clone)]
pub struct ActingUser(pub User);

impl ActingUser {
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.0.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Administrator role required"))
        }
    }
}

/// Look up the user named by the `X-User-Id` header.
///
/// `Ok(None)` when the header is absent; an unparseable id or an unknown user
/// is rejected.
pub fn resolve_acting_user(state: &AppState, headers: &HeaderMap) -> ApiResult<Option<User>> {
    let Some(value) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let user_id: UserId = value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(ApiError::unauthenticated)?;

    match state.db.get_user(user_id)? {
        Some(user) => Ok(Some(user)),
        None => Err(ApiError::unauthenticated()),
    }
}

impl FromRequestParts<AppState> for ActingUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_acting_user(state, &parts.headers)?
            .map(ActingUser)
            .ok_or_else(ApiError::unauthenticated)
    }
}
