use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::{
    backend::GenerationBackend,
    config::AppConfig,
    error::ServiceError,
    generation::{Gateway, GatewayReply},
    model::{ListModelsResponse, ShowModelRequest, ShowModelResponse},
    protocol::{PROTOCOL_VERSION, ROOT_RESPONSE},
};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

#[derive(Serialize)]
struct VersionResponse {
    version: &'static str,
}

pub fn build_router(config: &AppConfig, backend: Arc<dyn GenerationBackend>) -> Router {
    let state = AppState {
        gateway: Arc::new(Gateway::new(backend, config.codec)),
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/version", get(version))
        .route("/api/generate", post(generate))
        .route("/api/chat", post(chat))
        .route("/api/tags", get(tags))
        .route("/api/show", get(show).post(show_post))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn root() -> &'static str {
    ROOT_RESPONSE
}

async fn health() -> &'static str {
    "ok"
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: PROTOCOL_VERSION,
    })
}

async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<GatewayReply, ServiceError> {
    state.gateway.generate_completion(&body).await
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Result<GatewayReply, ServiceError> {
    state.gateway.chat_completion(&body).await
}

async fn tags(State(state): State<AppState>) -> Result<Json<ListModelsResponse>, ServiceError> {
    debug!("GET /api/tags");
    let listing = state
        .gateway
        .list_models()
        .await
        .inspect_err(|err| error!(%err, "failed to list models"))?;
    Ok(Json(listing))
}

async fn show(
    State(state): State<AppState>,
    Query(request): Query<ShowModelRequest>,
) -> Json<ShowModelResponse> {
    debug!(name = ?request.name, "GET /api/show");
    Json(state.gateway.show_model(&request))
}

// The body names a model, but any body (or none) is accepted.
async fn show_post(State(state): State<AppState>, body: Bytes) -> Json<ShowModelResponse> {
    let request: ShowModelRequest = serde_json::from_slice(&body).unwrap_or_default();
    debug!(name = ?request.name.as_ref().or(request.model.as_ref()), "POST /api/show");
    Json(state.gateway.show_model(&request))
}
