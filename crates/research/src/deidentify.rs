//! Stage-2 deidentification.
//!
//! The transport ids carried by an incoming bundle are resolved into durable
//! research pseudonyms through the trust center, then substituted throughout
//! the bundle. A transport id the trust center no longer knows (expired or
//! already consumed) is logged and left in place; it never aborts the bundle.

use std::sync::Arc;

use async_trait::async_trait;

use ptx_api::{replace_ids, Bundle, PseudonymResolver, TransferResult, TransportBundle};
use ptx_util::retry::RetryConfig;

/// Turns a transport bundle into its final, pseudonymized representation.
#[async_trait]
pub trait Deidentifier: Send + Sync {
    async fn deidentify(&self, bundle: TransportBundle) -> TransferResult<Bundle>;
}

/// Stage-2 deidentifier backed by the trust center's resolution endpoint.
pub struct Stage2Deidentifier {
    resolver: Arc<dyn PseudonymResolver>,
    domain: String,
    retry: RetryConfig,
}

impl Stage2Deidentifier {
    pub fn new(resolver: Arc<dyn PseudonymResolver>, domain: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            resolver,
            domain: domain.into(),
            retry,
        }
    }
}

#[async_trait]
impl Deidentifier for Stage2Deidentifier {
    async fn deidentify(&self, bundle: TransportBundle) -> TransferResult<Bundle> {
        if bundle.transport_ids.is_empty() {
            return Ok(bundle.bundle);
        }

        let mapping = self
            .retry
            .run(|| self.resolver.resolve(&self.domain, &bundle.transport_ids))
            .await?;

        for unresolved in bundle.transport_ids.iter().filter(|tid| !mapping.contains_key(*tid)) {
            tracing::warn!(transport_id = %unresolved, "transport id could not be resolved, leaving in place");
        }

        Ok(replace_ids(&bundle.bundle, &mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptx_api::TransferError;
    use serde_json::json;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeResolver {
        calls: AtomicU32,
        fail_first: u32,
        known: BTreeSet<String>,
    }

    impl FakeResolver {
        fn knowing(ids: &[&str]) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first: 0,
                known: ids.iter().map(|s| s.to_string()).collect(),
            }
        }

        fn flaky(fail_first: u32, ids: &[&str]) -> Self {
            Self {
                fail_first,
                ..Self::knowing(ids)
            }
        }
    }

    #[async_trait]
    impl PseudonymResolver for FakeResolver {
        async fn resolve(
            &self,
            _domain: &str,
            transport_ids: &BTreeSet<String>,
        ) -> TransferResult<HashMap<String, String>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail_first {
                return Err(TransferError::Transient("connection refused".into()));
            }
            Ok(transport_ids
                .iter()
                .filter(|tid| self.known.contains(*tid))
                .map(|tid| (tid.clone(), tid.replace("tid", "ps")))
                .collect())
        }
    }

    fn transport_bundle(tids: &[&str]) -> TransportBundle {
        TransportBundle::new(
            Bundle::new(vec![
                json!({"resourceType": "Patient", "id": "tid-1"}),
                json!({"resourceType": "Observation", "subject": {"reference": "Patient/tid-1"}}),
            ]),
            tids.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn substitutes_resolved_pseudonyms() {
        let deidentifier = Stage2Deidentifier::new(
            Arc::new(FakeResolver::knowing(&["tid-1"])),
            "research-a",
            RetryConfig::none(),
        );

        let bundle = deidentifier
            .deidentify(transport_bundle(&["tid-1"]))
            .await
            .expect("resolution succeeds");

        let rendered = serde_json::to_string(&bundle).expect("serialize");
        assert!(!rendered.contains("tid-1"));
        assert!(rendered.contains("Patient/ps-1"));
    }

    #[tokio::test]
    async fn unresolved_ids_are_left_in_place() {
        let deidentifier = Stage2Deidentifier::new(
            Arc::new(FakeResolver::knowing(&[])),
            "research-a",
            RetryConfig::none(),
        );

        let bundle = deidentifier
            .deidentify(transport_bundle(&["tid-1"]))
            .await
            .expect("partial resolution is not an error");

        let rendered = serde_json::to_string(&bundle).expect("serialize");
        assert!(rendered.contains("tid-1"));
    }

    #[tokio::test]
    async fn bundles_without_transport_ids_pass_through() {
        let deidentifier = Stage2Deidentifier::new(
            Arc::new(FakeResolver::knowing(&[])),
            "research-a",
            RetryConfig::none(),
        );

        let incoming = TransportBundle::new(
            Bundle::new(vec![json!({"resourceType": "Observation"})]),
            BTreeSet::new(),
        );
        let bundle = deidentifier.deidentify(incoming).await.expect("passthrough");
        assert_eq!(bundle.resource_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_trust_center_failures() {
        let deidentifier = Stage2Deidentifier::new(
            Arc::new(FakeResolver::flaky(2, &["tid-1"])),
            "research-a",
            RetryConfig::default(),
        );

        let bundle = deidentifier
            .deidentify(transport_bundle(&["tid-1"]))
            .await
            .expect("third attempt succeeds");
        let rendered = serde_json::to_string(&bundle).expect("serialize");
        assert!(rendered.contains("Patient/ps-1"));
    }
}
