//! Lookup lists for clients, served from configuration.

use super::AppState;
use crate::config::MetadataConfig;
use axum::{Json, Router, extract::State, routing::get};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/metadata", get(all_metadata))
        .route("/api/metadata/task-statuses", get(task_statuses))
        .route("/api/metadata/task-priorities", get(task_priorities))
}

async fn all_metadata(State(state): State<AppState>) -> Json<MetadataConfig> {
    Json(state.config.metadata.clone())
}

async fn task_statuses(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.config.metadata.task_statuses.clone())
}

async fn task_priorities(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.config.metadata.task_priorities.clone())
}
