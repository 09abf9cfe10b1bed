//! IBN API /v1: REST endpoints over the policy store and pipeline
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::{AppState, SharedState};

pub const DEFAULT_ADDR: &str = "0.0.0.0:8787";

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handlers::health))
        .route("/v1/policies", get(handlers::list_policies))
        .route("/v1/policies/{policy_id}", get(handlers::get_policy))
        .route("/v1/policies/{policy_id}/run", post(handlers::run_policy))
        .route("/v1/inventory/refresh", post(handlers::refresh))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors())
        .with_state(Arc::new(state))
}

pub async fn run(addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("IBN API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
