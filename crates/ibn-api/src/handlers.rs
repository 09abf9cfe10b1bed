//! API Handlers
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ibn_core::{IbnError, PolicyDocument, StageContext};
use ibn_inventory::{load_inventory, load_topology, refresh_inventory};
use ibn_stages::{Pipeline, PipelineOptions, PipelineReport};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::state::SharedState;

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })),
    )
}

pub async fn list_policies(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PolicyDocument>>, ApiError> {
    Ok(Json(state.store.list()?))
}

pub async fn get_policy(
    State(state): State<SharedState>,
    Path(policy_id): Path<String>,
) -> Result<Json<PolicyDocument>, ApiError> {
    Ok(Json(state.store.require(&policy_id)?))
}

/// Body is optional; an empty body runs every stage.
pub async fn run_policy(
    State(state): State<SharedState>,
    Path(policy_id): Path<String>,
    body: Bytes,
) -> Result<Json<PipelineReport>, ApiError> {
    let options: PipelineOptions = if body.iter().all(u8::is_ascii_whitespace) {
        PipelineOptions::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| IbnError::Validation(format!("invalid run options: {}", e)))?
    };

    let paths = &state.settings.paths;
    let topology = load_topology(&paths.topology)?;
    let inventory = load_inventory(&paths.inventory)?;
    let ctx = StageContext::new(inventory, state.settings.controller.host.clone())
        .with_topology(topology);

    info!(%policy_id, ?options, trace_id = %ctx.trace_id, "pipeline requested");
    let report = Pipeline::standard(state.connector.clone())
        .run(&policy_id, &state.store, &ctx, options)
        .await?;
    Ok(Json(report))
}

pub async fn refresh(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let paths = &state.settings.paths;
    let topology = load_topology(&paths.topology)?;
    let snapshot = refresh_inventory(
        state.controller.as_ref(),
        &topology,
        &state.settings.controller.host,
        &paths.inventory,
    )
    .await?;

    Ok(Json(json!({
        "topology_name": snapshot.topology_name,
        "project_id": snapshot.project_id,
        "nodes": snapshot.node_names().collect::<Vec<_>>(),
        "links": snapshot.links.len(),
    })))
}
