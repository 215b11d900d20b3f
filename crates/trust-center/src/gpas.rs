//! Client for the external FHIR pseudonymization service (gPAS).
//!
//! The service is not reimplemented here; only its contract is: a FHIR
//! `Parameters` exchange against `$pseudonymizeAllowCreate`, with a 400
//! response whose OperationOutcome diagnostics start with "Unknown domain"
//! mapped to the distinct [`TrustCenterError::UnknownDomain`] kind.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use ptx_util::http::HttpClientConfig;
use serde_json::{json, Value};

use crate::error::{TrustCenterError, TrustCenterResult};

const FHIR_JSON: &str = "application/fhir+json";

/// Contract against the external pseudonymization service.
#[async_trait]
pub trait PseudonymService: Send + Sync {
    /// Fetches the durable pseudonym for each original id, creating missing
    /// ones, scoped to the consent domain.
    async fn fetch_or_create(
        &self,
        domain: &str,
        ids: &BTreeSet<String>,
    ) -> TrustCenterResult<HashMap<String, String>>;
}

pub struct GpasClient {
    http: reqwest::Client,
    config: HttpClientConfig,
}

impl GpasClient {
    pub fn new(http: reqwest::Client, config: HttpClientConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl PseudonymService for GpasClient {
    async fn fetch_or_create(
        &self,
        domain: &str,
        ids: &BTreeSet<String>,
    ) -> TrustCenterResult<HashMap<String, String>> {
        tracing::trace!(domain, count = ids.len(), "fetching pseudonyms");
        let request = self
            .http
            .post(self.config.url("/$pseudonymizeAllowCreate"))
            .header(reqwest::header::CONTENT_TYPE, FHIR_JSON)
            .header(reqwest::header::ACCEPT, FHIR_JSON)
            .json(&pseudonymize_parameters(domain, ids));

        let response = self
            .config
            .authorize(request)
            .send()
            .await
            .map_err(|e| TrustCenterError::Transient(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            let body: Value = response
                .json()
                .await
                .map_err(|e| TrustCenterError::MalformedResponse(e.to_string()))?;
            return Err(classify_bad_request(&body));
        }
        if status.is_server_error() {
            return Err(TrustCenterError::Transient(format!(
                "pseudonymization service answered {status}"
            )));
        }
        if !status.is_success() {
            return Err(TrustCenterError::Upstream(format!(
                "pseudonymization service answered {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TrustCenterError::MalformedResponse(e.to_string()))?;
        parse_pseudonym_parameters(&body)
    }
}

/// FHIR `Parameters` body for `$pseudonymizeAllowCreate`: one `target`
/// parameter naming the domain, one `original` parameter per id.
fn pseudonymize_parameters(domain: &str, ids: &BTreeSet<String>) -> Value {
    let mut parameters = vec![json!({"name": "target", "valueString": domain})];
    parameters.extend(
        ids.iter()
            .map(|id| json!({"name": "original", "valueString": id})),
    );
    json!({"resourceType": "Parameters", "parameter": parameters})
}

/// Extracts the original → pseudonym mapping from a `Parameters` response.
///
/// The service answers with one `pseudonym` parameter per id, each carrying
/// `original` and `pseudonym` parts.
pub(crate) fn parse_pseudonym_parameters(body: &Value) -> TrustCenterResult<HashMap<String, String>> {
    let parameters = body
        .get("parameter")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            TrustCenterError::MalformedResponse("response carries no parameter list".into())
        })?;

    let mut mapping = HashMap::new();
    for parameter in parameters {
        if parameter.get("name").and_then(Value::as_str) != Some("pseudonym") {
            continue;
        }
        let parts = parameter.get("part").and_then(Value::as_array).ok_or_else(|| {
            TrustCenterError::MalformedResponse("pseudonym parameter carries no parts".into())
        })?;
        let original = part_value(parts, "original");
        let pseudonym = part_value(parts, "pseudonym");
        match (original, pseudonym) {
            (Some(original), Some(pseudonym)) => {
                mapping.insert(original.to_owned(), pseudonym.to_owned());
            }
            _ => {
                return Err(TrustCenterError::MalformedResponse(
                    "pseudonym parameter misses original or pseudonym part".into(),
                ))
            }
        }
    }
    Ok(mapping)
}

fn part_value<'a>(parts: &'a [Value], name: &str) -> Option<&'a str> {
    parts
        .iter()
        .find(|part| part.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|part| part.get("valueString").and_then(Value::as_str))
}

/// Maps a 400 OperationOutcome to the error taxonomy: diagnostics starting
/// with "Unknown domain" become the distinct kind, everything else a generic
/// upstream failure.
pub(crate) fn classify_bad_request(body: &Value) -> TrustCenterError {
    let diagnostics = body
        .get("issue")
        .and_then(Value::as_array)
        .and_then(|issues| issues.first())
        .and_then(|issue| issue.get("diagnostics"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    tracing::error!("pseudonymization service rejected the request: {diagnostics}");
    if diagnostics.starts_with("Unknown domain") {
        TrustCenterError::UnknownDomain(diagnostics.to_owned())
    } else {
        TrustCenterError::Upstream(format!("bad request: {diagnostics}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_carries_target_and_originals() {
        let ids = BTreeSet::from(["p-1".to_owned(), "p-2".to_owned()]);
        let body = pseudonymize_parameters("research-a", &ids);
        let parameters = body["parameter"].as_array().expect("parameter list");
        assert_eq!(parameters.len(), 3);
        assert_eq!(parameters[0]["name"], "target");
        assert_eq!(parameters[0]["valueString"], "research-a");
        assert_eq!(parameters[1]["name"], "original");
    }

    #[test]
    fn parses_pseudonym_parameters() {
        let body = json!({
            "resourceType": "Parameters",
            "parameter": [{
                "name": "pseudonym",
                "part": [
                    {"name": "original", "valueString": "p-1"},
                    {"name": "target", "valueString": "research-a"},
                    {"name": "pseudonym", "valueString": "ps-1"}
                ]
            }]
        });

        let mapping = parse_pseudonym_parameters(&body).expect("parse response");
        assert_eq!(mapping.get("p-1").map(String::as_str), Some("ps-1"));
    }

    #[test]
    fn rejects_responses_without_parameters() {
        let body = json!({"resourceType": "Parameters"});
        assert!(matches!(
            parse_pseudonym_parameters(&body),
            Err(TrustCenterError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unknown_domain_diagnostics_map_to_the_distinct_kind() {
        let body = json!({
            "resourceType": "OperationOutcome",
            "issue": [{"severity": "error", "diagnostics": "Unknown domain research-x"}]
        });
        assert!(matches!(
            classify_bad_request(&body),
            TrustCenterError::UnknownDomain(_)
        ));

        let body = json!({
            "resourceType": "OperationOutcome",
            "issue": [{"severity": "error", "diagnostics": "something else entirely"}]
        });
        assert!(matches!(
            classify_bad_request(&body),
            TrustCenterError::Upstream(_)
        ));
    }
}
