//! Relationship endpoints, nested under a task.

use super::{ActingUser, AppState};
use crate::error::ApiResult;
use crate::types::{RelationshipId, RelationshipView, TaskId, TaskTree};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

/// Request body for linking two tasks.
#[derive(Debug, Deserialize)]
pub struct CreateRelationshipRequest {
    pub related_task_id: TaskId,
    /// `"parent"`, `"child"`, or any other tag.
    #[serde(default = "default_relationship_type")]
    pub relationship_type: String,
}

fn default_relationship_type() -> String {
    "Related".to_string()
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/tasks/{task_id}/relationships",
            get(list_relationships).post(create_relationship),
        )
        .route("/api/tasks/{task_id}/relationships/tree", get(task_tree))
        .route(
            "/api/tasks/{task_id}/relationships/{relationship_id}",
            get(get_relationship).delete(delete_relationship),
        )
}

async fn create_relationship(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(task_id): Path<TaskId>,
    Json(request): Json<CreateRelationshipRequest>,
) -> ApiResult<(StatusCode, Json<RelationshipView>)> {
    let view = state.graph().create_edge(
        task_id,
        request.related_task_id,
        &request.relationship_type,
    )?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_relationships(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<Vec<RelationshipView>>> {
    Ok(Json(state.graph().list_edges(task_id)?))
}

async fn get_relationship(
    State(state): State<AppState>,
    _user: ActingUser,
    Path((task_id, relationship_id)): Path<(TaskId, RelationshipId)>,
) -> ApiResult<Json<RelationshipView>> {
    Ok(Json(state.graph().get_edge(task_id, relationship_id)?))
}

async fn delete_relationship(
    State(state): State<AppState>,
    _user: ActingUser,
    Path((task_id, relationship_id)): Path<(TaskId, RelationshipId)>,
) -> ApiResult<StatusCode> {
    state.graph().delete_edge(task_id, relationship_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn task_tree(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<TaskTree>> {
    Ok(Json(state.graph().task_tree(task_id)?))
}
