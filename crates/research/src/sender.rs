//! Persistence of finalized bundles into the research FHIR store.

use async_trait::async_trait;
use serde_json::{json, Value};

use ptx_api::{Bundle, BundlePersister, TransferError, TransferResult};
use ptx_util::http::HttpClientConfig;
use ptx_util::retry::RetryConfig;

/// Writes a bundle into the research FHIR store as one transaction,
/// retrying transient failures within the configured bound.
pub struct FhirStoreSender {
    http: reqwest::Client,
    config: HttpClientConfig,
    retry: RetryConfig,
}

impl FhirStoreSender {
    pub fn new(http: reqwest::Client, config: HttpClientConfig, retry: RetryConfig) -> Self {
        Self { http, config, retry }
    }

    async fn post_transaction(&self, transaction: &Value) -> TransferResult<()> {
        let request = self
            .http
            .post(self.config.url("/"))
            .header("Content-Type", "application/fhir+json")
            .json(transaction);

        let response = self
            .config
            .authorize(request)
            .send()
            .await
            .map_err(|e| TransferError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(TransferError::Transient(format!(
                "research store answered {status}"
            )));
        }
        if !status.is_success() {
            return Err(TransferError::Upstream(format!(
                "research store answered {status}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BundlePersister for FhirStoreSender {
    async fn persist(&self, bundle: Bundle) -> TransferResult<usize> {
        let count = bundle.resource_count();
        if count == 0 {
            return Ok(0);
        }

        let transaction = transaction_bundle(bundle);
        self.retry.run(|| self.post_transaction(&transaction)).await?;
        tracing::debug!(resources = count, "persisted bundle");
        Ok(count)
    }
}

/// Builds a FHIR transaction bundle around the resources.
///
/// Resources carrying a type and id become idempotent `PUT Type/id` entries;
/// anything else falls back to `POST Type`.
fn transaction_bundle(bundle: Bundle) -> Value {
    let entries: Vec<Value> = bundle
        .into_resources()
        .into_iter()
        .map(|resource| {
            let resource_type = resource
                .get("resourceType")
                .and_then(Value::as_str)
                .unwrap_or("Resource")
                .to_owned();
            let request = match resource.get("id").and_then(Value::as_str) {
                Some(id) => json!({"method": "PUT", "url": format!("{resource_type}/{id}")}),
                None => json!({"method": "POST", "url": resource_type}),
            };
            json!({"resource": resource, "request": request})
        })
        .collect();

    json!({
        "resourceType": "Bundle",
        "type": "transaction",
        "entry": entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identified_resources_become_put_entries() {
        let bundle = Bundle::new(vec![json!({"resourceType": "Patient", "id": "ps-1"})]);
        let transaction = transaction_bundle(bundle);

        assert_eq!(transaction["type"], "transaction");
        assert_eq!(transaction["entry"][0]["request"]["method"], "PUT");
        assert_eq!(transaction["entry"][0]["request"]["url"], "Patient/ps-1");
    }

    #[test]
    fn unidentified_resources_fall_back_to_post() {
        let bundle = Bundle::new(vec![json!({"resourceType": "Observation"})]);
        let transaction = transaction_bundle(bundle);

        assert_eq!(transaction["entry"][0]["request"]["method"], "POST");
        assert_eq!(transaction["entry"][0]["request"]["url"], "Observation");
    }

    #[test]
    fn entries_preserve_bundle_order() {
        let bundle = Bundle::new(vec![
            json!({"resourceType": "Patient", "id": "ps-1"}),
            json!({"resourceType": "Observation", "id": "o-1"}),
        ]);
        let transaction = transaction_bundle(bundle);

        let urls: Vec<_> = transaction["entry"]
            .as_array()
            .expect("entries present")
            .iter()
            .map(|entry| entry["request"]["url"].as_str().expect("url present"))
            .collect();
        assert_eq!(urls, ["Patient/ps-1", "Observation/o-1"]);
    }
}
