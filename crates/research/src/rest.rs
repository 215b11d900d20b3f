//! REST surface of the research agent.
//!
//! One endpoint per project receives transport bundles; all behaviour lives
//! in [`runner`](crate::runner) and the library modules.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use ptx_api::{TransferError, TransportBundle};

use crate::error::ResearchError;
use crate::process::TransferProcess;
use crate::runner::{run, Phase, RunResult};

/// Application state shared across research-agent handlers.
#[derive(Clone)]
pub struct AppState {
    pub processes: Arc<HashMap<String, Arc<TransferProcess>>>,
}

#[derive(Serialize)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v2/:project/patient", post(receive_bundle))
        .with_state(state)
}

async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "research agent is alive".into(),
    })
}

async fn receive_bundle(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(bundle): Json<TransportBundle>,
) -> Result<Json<RunResult>, (StatusCode, Json<RunResult>)> {
    let received_resources = bundle.bundle.resource_count();
    let process = state.processes.get(&project).ok_or_else(|| {
        error_response(
            ResearchError::UnknownProject(project.clone()),
            received_resources,
        )
    })?;

    run(process, bundle)
        .await
        .map(Json)
        .map_err(|e| error_response(ResearchError::from(e), received_resources))
}

/// Failures are reported back to the sending agent as a typed result body:
/// phase ERROR, the count that arrived, nothing sent.
fn error_response(e: ResearchError, received_resources: usize) -> (StatusCode, Json<RunResult>) {
    tracing::error!("research-agent request failed: {e}");
    let status = match &e {
        ResearchError::UnknownProject(_) => StatusCode::NOT_FOUND,
        ResearchError::Transfer(TransferError::UnknownDomain(_)) => StatusCode::BAD_REQUEST,
        ResearchError::Transfer(TransferError::Transient(_) | TransferError::Upstream(_)) => {
            StatusCode::BAD_GATEWAY
        }
        ResearchError::Transfer(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(RunResult {
            phase: Phase::Error,
            received_resources,
            sent_resources: 0,
        }),
    )
}
