//! HTTP API.
//!
//! JSON endpoints for tasks, users, task relationships and lookup metadata.
//! Every route except the health check expects the acting user in the
//! `X-User-Id` header, which the token-issuing front end sets after it has
//! verified the caller.

pub mod identity;
pub mod metadata;
pub mod relationships;
pub mod tasks;
pub mod users;

use crate::config::Config;
use crate::db::Database;
use crate::graph::RelationshipGraph;
use axum::{
    Router,
    response::{IntoResponse, Json},
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use identity::{ActingUser, USER_ID_HEADER};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Graph engine over the shared database, configured for this server.
    pub fn graph(&self) -> RelationshipGraph<'_, Database> {
        RelationshipGraph::new(self.db.as_ref()).with_max_depth(self.config.graph.max_tree_depth)
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(tasks::routes())
        .merge(relationships::routes())
        .merge(users::routes())
        .merge(metadata::routes())
        .route("/api/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;
    info!("API listening on http://{}", bound_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("API server shutting down");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.1.0",
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("0.1.0"));
    }
}
