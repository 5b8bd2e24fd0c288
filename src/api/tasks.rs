//! Task endpoints.

use super::{ActingUser, AppState};
use crate::error::{ApiError, ApiResult};
use crate::types::{NewTask, TaskDetail, TaskFilter, TaskId, TaskUpdate};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
}

async fn list_tasks(
    State(state): State<AppState>,
    _user: ActingUser,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<TaskDetail>>> {
    Ok(Json(state.db.list_tasks(&filter)?))
}

async fn create_task(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Json(input): Json<NewTask>,
) -> ApiResult<(StatusCode, Json<TaskDetail>)> {
    let task = state.db.create_task(user.user_id, input)?;
    info!(task_id = task.task_id(), creator_id = user.user_id, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<TaskDetail>> {
    state
        .db
        .get_task_detail(task_id)?
        .map(Json)
        .ok_or_else(|| ApiError::task_not_found(task_id))
}

async fn update_task(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(task_id): Path<TaskId>,
    Json(update): Json<TaskUpdate>,
) -> ApiResult<Json<TaskDetail>> {
    Ok(Json(state.db.update_task(task_id, update)?))
}

/// Only the creator or an administrator may delete a task.
async fn delete_task(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(task_id): Path<TaskId>,
) -> ApiResult<StatusCode> {
    let task = state
        .db
        .get_task_detail(task_id)?
        .ok_or_else(|| ApiError::task_not_found(task_id))?;

    if task.task.creator_id != user.user_id && !user.is_admin() {
        return Err(ApiError::forbidden(
            "Only the task creator or an administrator can delete this task",
        ));
    }

    if !state.db.delete_task(task_id)? {
        return Err(ApiError::task_not_found(task_id));
    }
    info!(task_id, user_id = user.user_id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}
