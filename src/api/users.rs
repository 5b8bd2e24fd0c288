//! User endpoints.
//!
//! Registration is open while no user exists so the first account can be
//! created; after that only administrators may add or remove users. Users
//! may update their own profile.

use super::identity::resolve_acting_user;
use super::{ActingUser, AppState};
use crate::error::{ApiError, ApiResult};
use crate::types::{NewUser, User, UserId, UserUpdate};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let acting = resolve_acting_user(&state, &headers)?;
    let user = state.db.create_user(acting.as_ref(), input)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(
    State(state): State<AppState>,
    _user: ActingUser,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.list_users()?))
}

async fn get_user(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<User>> {
    state
        .db
        .get_user(user_id)?
        .map(Json)
        .ok_or_else(|| ApiError::user_not_found(user_id))
}

async fn update_user(
    State(state): State<AppState>,
    ActingUser(acting): ActingUser,
    Path(user_id): Path<UserId>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.db.update_user(&acting, user_id, update)?))
}

async fn delete_user(
    State(state): State<AppState>,
    acting: ActingUser,
    Path(user_id): Path<UserId>,
) -> ApiResult<StatusCode> {
    acting.require_admin()?;
    state.db.delete_user(user_id)?;
    Ok(StatusCode::NO_CONTENT)
}
