//! REST surface of the clinical agent.
//!
//! Runs are started and queried here; all orchestration lives in
//! [`TransferRunner`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::error::ClinicalError;
use crate::process::TransferProcess;
use crate::runner::{RunSnapshot, TransferRunner};

/// Application state shared across clinical-agent handlers.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<TransferRunner>,
    pub processes: Arc<HashMap<String, Arc<TransferProcess>>>,
}

#[derive(Serialize)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunRes {
    pub run_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v2/process/:project/start", post(start_run))
        .route("/api/v2/process/status/:run_id", get(run_status))
        .with_state(state)
}

async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "clinical agent is alive".into(),
    })
}

async fn start_run(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<StartRunRes>, (StatusCode, &'static str)> {
    let process = state
        .processes
        .get(&project)
        .ok_or_else(|| error_response(ClinicalError::UnknownProject(project.clone())))?;

    let run_id = state.runner.run(Arc::clone(process));
    Ok(Json(StartRunRes { run_id }))
}

async fn run_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunSnapshot>, (StatusCode, &'static str)> {
    state
        .runner
        .status(&run_id)
        .map(Json)
        .map_err(error_response)
}

fn error_response(e: ClinicalError) -> (StatusCode, &'static str) {
    tracing::error!("clinical-agent request failed: {e}");
    match e {
        ClinicalError::RunNotFound(_) => (StatusCode::NOT_FOUND, "run not found"),
        ClinicalError::UnknownProject(_) => (StatusCode::NOT_FOUND, "unknown project"),
        ClinicalError::Transfer(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_projects_and_runs_map_to_not_found() {
        let (status, body) = error_response(ClinicalError::UnknownProject("nope".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "unknown project");

        let (status, body) = error_response(ClinicalError::RunNotFound("r-1".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "run not found");
    }

    #[test]
    fn pipeline_failures_map_to_internal_errors() {
        let e = ClinicalError::Transfer(ptx_api::TransferError::Upstream("503".into()));
        let (status, _) = error_response(e);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
