//! HTTP surface
//!
//! JSON endpoints used by the playground front-end. Pipeline work is blocking
//! and runs on tokio's blocking pool.

pub mod errors;


use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::completion::{CompletionRequest, ModelOption};
use crate::config::Config;
use crate::graph::{ConversationGraph, DEFAULT_ROOT_LABEL, build_graph};
use crate::pipeline::CompletionPipeline;

pub use errors::{ApiError, ErrorBody};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<CompletionPipeline>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNodesRequest {
    pub text: String,
}

/// Routes served by `serve`
#[inline]
pub fn router(pipeline: Arc<CompletionPipeline>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/get_completion", post(get_completion))
        .route("/update_nodes", post(update_nodes))
        .route("/models", get(list_models))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pipeline })
}

/// Bind the configured address and serve until ctrl-c
#[inline]
pub async fn serve(config: &Config) -> Result<()> {
    let pipeline = Arc::new(CompletionPipeline::from_config(config)?);
    let app = router(pipeline);

    let address = config.server.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("Listening on http://{}", address);
    info!(
        "Recording embeddings to {}",
        config.embeddings_path().display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn get_completion(
    State(state): State<AppState>,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    request
        .validate()
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let pipeline = Arc::clone(&state.pipeline);
    let text = tokio::task::spawn_blocking(move || pipeline.generate(&request))
        .await
        .map_err(|e| {
            error!("Completion task failed: {}", e);
            ApiError::Internal
        })??;

    Ok(Json(CompletionResponse { text }))
}

async fn update_nodes(
    payload: Result<Json<UpdateNodesRequest>, JsonRejection>,
) -> Result<Json<ConversationGraph>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    Ok(Json(build_graph(DEFAULT_ROOT_LABEL, &request.text)))
}

async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<ModelOption>>, ApiError> {
    let pipeline = Arc::clone(&state.pipeline);
    let models = tokio::task::spawn_blocking(move || pipeline.list_models())
        .await
        .map_err(|e| {
            error!("Model listing task failed: {}", e);
            ApiError::Internal
        })?
        .map_err(|e| {
            error!("{:#}", e);
            ApiError::Models
        })?;

    Ok(Json(models))
}
