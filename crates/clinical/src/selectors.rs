//! Data selection against the clinical FHIR store.
//!
//! The store itself is an external collaborator; this client only exercises
//! the `$everything` contract and lifts the response into the opaque bundle
//! representation.

use async_trait::async_trait;
use serde_json::Value;

use ptx_api::{Bundle, ConsentedPatient, DataSelector, TransferError, TransferResult};
use ptx_util::http::HttpClientConfig;

/// Selects a patient's complete record via `Patient/<id>/$everything`.
pub struct EverythingDataSelector {
    http: reqwest::Client,
    config: HttpClientConfig,
}

impl EverythingDataSelector {
    pub fn new(http: reqwest::Client, config: HttpClientConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl DataSelector for EverythingDataSelector {
    async fn select(&self, patient: &ConsentedPatient) -> TransferResult<Bundle> {
        let path = format!("/Patient/{}/$everything", patient.id);
        let request = self.http.get(self.config.url(&path));

        let response = self
            .config
            .authorize(request)
            .send()
            .await
            .map_err(|e| TransferError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(TransferError::Transient(format!(
                "clinical store answered {status}"
            )));
        }
        if !status.is_success() {
            return Err(TransferError::Upstream(format!(
                "clinical store answered {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TransferError::InvalidPayload(e.to_string()))?;
        bundle_from_fhir(&body)
    }
}

/// Lifts a FHIR searchset/collection bundle into the opaque representation:
/// the resources of its entries, in order.
fn bundle_from_fhir(body: &Value) -> TransferResult<Bundle> {
    let entries = body
        .get("entry")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let resources = entries
        .iter()
        .map(|entry| {
            entry
                .get("resource")
                .cloned()
                .ok_or_else(|| TransferError::InvalidPayload("bundle entry without resource".into()))
        })
        .collect::<TransferResult<Vec<Value>>>()?;
    Ok(Bundle::new(resources))
}
