use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use common::{ContainerObservation, Node, Report, TagStatus, TagSummary, Topology};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::TagError;
use crate::state::AppState;
use crate::tagger::tag_once;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/containers", post(observe_container))
        .route("/api/v1/containers/:id", delete(forget_container))
        .route("/api/v1/report", get(get_report))
        .route("/api/v1/topologies/:name", get(get_topology))
        .route("/api/v1/tag", post(trigger_tag))
        .route("/api/v1/tag/status", get(tag_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Un observador reporta un contenedor (nuevo o actualizado)
async fn observe_container(
    State(state): State<AppState>,
    Json(obs): Json<ContainerObservation>,
) -> Json<Node> {
    let node = state.upsert_container(obs.to_node());
    info!("contenedor observado: {} ({} labels)", node.id, obs.labels.len());
    Json(node)
}

async fn forget_container(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match state.remove_container(&id) {
        Some(_) => {
            info!("contenedor {} eliminado del reporte", id);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn get_report(State(state): State<AppState>) -> Json<Report> {
    Json(state.report_snapshot())
}

async fn get_topology(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Topology>, StatusCode> {
    let report = state.report_snapshot();
    report
        .topology(&name)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

// Corre una pasada ahora, sin esperar al loop
async fn trigger_tag(
    State(state): State<AppState>,
) -> Result<Json<TagSummary>, (StatusCode, Json<TagStatus>)> {
    match tag_once(&state).await {
        Ok(summary) => Ok(Json(summary)),
        Err(TagError::Fetch { .. }) => Err((StatusCode::BAD_GATEWAY, Json(state.status()))),
        Err(TagError::Panicked(_)) => {
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(state.status())))
        }
    }
}

async fn tag_status(State(state): State<AppState>) -> Json<TagStatus> {
    Json(state.status())
}
