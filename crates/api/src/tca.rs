//! Request and response bodies of the trust-center API.
//!
//! Shared between the trust-center REST surface and the agent-side clients so
//! both ends agree on one wire schema.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Body of an issuance (`cd/transport-ids`) or resolution
/// (`rd/resolve-pseudonyms`) request: a consent domain plus the identifiers to
/// act on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportIdsRequest {
    pub domain: String,
    pub ids: BTreeSet<String>,
}

/// Body of a direct pseudonym lookup, bypassing transport-id issuance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PseudonymizedIdsRequest {
    pub ids: BTreeSet<String>,
}

/// Response of an explicit transport-id invalidation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeletedResponse {
    pub removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_issuance_request() {
        let body = r#"{"domain": "research-a", "ids": ["p-1", "p-2"]}"#;
        let request: TransportIdsRequest = serde_json::from_str(body).expect("parse request");
        assert_eq!(request.domain, "research-a");
        assert_eq!(request.ids.len(), 2);
    }

    #[test]
    fn rejects_unknown_request_fields() {
        let body = r#"{"domain": "research-a", "ids": [], "ttl": 60}"#;
        assert!(serde_json::from_str::<TransportIdsRequest>(body).is_err());
    }
}
