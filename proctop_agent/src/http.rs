//! HTTP routes: latest snapshots for clients, ingest for pushing agents.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::state::AppState;
use crate::types::{IngestRequest, MachineReport};

pub const LATEST_PATH: &str = "/api/processes/latest/";
pub const INGEST_PATH: &str = "/api/processes/";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(LATEST_PATH, get(latest))
        .route(INGEST_PATH, post(ingest))
        .with_state(state)
}

async fn latest(State(state): State<AppState>) -> Json<Vec<MachineReport>> {
    Json(state.store.snapshot().await)
}

async fn ingest(
    State(state): State<AppState>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rej) => {
            warn!(error = %rej, "rejected ingest body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": rej.body_text() })),
            )
                .into_response();
        }
    };
    let hostname = req.hostname.trim();
    if hostname.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "hostname is required" })),
        )
            .into_response();
    }
    debug!(host = %hostname, count = req.processes.len(), "ingest");
    state.store.replace(hostname, req.processes).await;
    Json(json!({ "status": "success" })).into_response()
}
