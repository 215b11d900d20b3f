//! REST surface of the trust center.
//!
//! A thin shell over [`PseudonymIssuer`]; all behaviour lives in the library
//! modules.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Serialize;

use ptx_api::tca::{DeletedResponse, PseudonymizedIdsRequest, TransportIdsRequest};

use crate::error::TrustCenterError;
use crate::issuer::PseudonymIssuer;

/// Application state shared across trust-center handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<PseudonymIssuer>,
}

#[derive(Serialize)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v2/cd/transport-ids", post(retrieve_transport_ids))
        .route("/api/v2/cd/transport-ids", delete(delete_transport_ids))
        .route("/api/v2/cd/fetch-pseudonyms", post(fetch_pseudonymized_ids))
        .route("/api/v2/rd/resolve-pseudonyms", post(resolve_pseudonyms))
        .with_state(state)
}

async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "trust center is alive".into(),
    })
}

async fn retrieve_transport_ids(
    State(state): State<AppState>,
    Json(request): Json<TransportIdsRequest>,
) -> Result<Json<HashMap<String, String>>, (StatusCode, &'static str)> {
    state
        .issuer
        .retrieve_transport_ids(&request.ids, &request.domain)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn resolve_pseudonyms(
    State(state): State<AppState>,
    Json(request): Json<TransportIdsRequest>,
) -> Result<Json<HashMap<String, String>>, (StatusCode, &'static str)> {
    state
        .issuer
        .resolve_pseudonyms(&request.ids, &request.domain)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn fetch_pseudonymized_ids(
    State(state): State<AppState>,
    Json(request): Json<PseudonymizedIdsRequest>,
) -> Result<Json<HashMap<String, String>>, (StatusCode, &'static str)> {
    state
        .issuer
        .fetch_pseudonymized_ids(&request.ids)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn delete_transport_ids(
    State(state): State<AppState>,
    Json(request): Json<PseudonymizedIdsRequest>,
) -> Result<Json<DeletedResponse>, (StatusCode, &'static str)> {
    state
        .issuer
        .delete_transport_ids(&request.ids)
        .await
        .map(|removed| Json(DeletedResponse { removed }))
        .map_err(error_response)
}

fn error_response(e: TrustCenterError) -> (StatusCode, &'static str) {
    tracing::error!("trust-center request failed: {e}");
    match e {
        TrustCenterError::UnknownDomain(_) => (StatusCode::BAD_REQUEST, "unknown consent domain"),
        TrustCenterError::Transient(_) | TrustCenterError::Upstream(_) | TrustCenterError::MalformedResponse(_) => {
            (StatusCode::BAD_GATEWAY, "pseudonymization service unavailable")
        }
        TrustCenterError::StoreConsistency(_)
        | TrustCenterError::TransportIdExhausted(_)
        | TrustCenterError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    }
}
