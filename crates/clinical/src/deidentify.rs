//! Stage-1 deidentification.
//!
//! Before a bundle leaves the clinical site, every protected identifier in it
//! is replaced by a freshly issued transport id. Substitution is total (no
//! original identifier remains) and consistent (the same original always maps
//! to the same transport id within one bundle).

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use ptx_api::{protected_ids, replace_ids, ConsentedPatientBundle, TransferResult, TransportBundle, TransportIdProvider};
use ptx_util::retry::RetryConfig;

/// Turns a consented patient bundle into its transport representation.
#[async_trait]
pub trait Deidentifier: Send + Sync {
    async fn deidentify(&self, bundle: ConsentedPatientBundle) -> TransferResult<TransportBundle>;
}

/// Stage-1 deidentifier backed by the trust center's issuance endpoint.
pub struct Stage1Deidentifier {
    provider: Arc<dyn TransportIdProvider>,
    domain: String,
    retry: RetryConfig,
}

impl Stage1Deidentifier {
    pub fn new(provider: Arc<dyn TransportIdProvider>, domain: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            provider,
            domain: domain.into(),
            retry,
        }
    }
}

#[async_trait]
impl Deidentifier for Stage1Deidentifier {
    async fn deidentify(&self, bundle: ConsentedPatientBundle) -> TransferResult<TransportBundle> {
        let ids = protected_ids(&bundle);

        let mapping = self
            .retry
            .run(|| self.provider.transport_ids(&self.domain, &ids))
            .await?;

        let transport_ids: BTreeSet<String> = mapping.values().cloned().collect();
        tracing::trace!(
            patient = %bundle.patient.id,
            count = transport_ids.len(),
            "replacing protected identifiers"
        );
        Ok(TransportBundle::new(
            replace_ids(&bundle.bundle, &mapping),
            transport_ids,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptx_api::{Bundle, ConsentedPatient, TransferError};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeProvider {
        calls: AtomicU32,
        fail_first: u32,
        unknown_domain: bool,
    }

    impl FakeProvider {
        fn ok() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first: 0,
                unknown_domain: false,
            }
        }

        fn flaky(fail_first: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first,
                unknown_domain: false,
            }
        }

        fn unknown_domain() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first: 0,
                unknown_domain: true,
            }
        }
    }

    #[async_trait]
    impl TransportIdProvider for FakeProvider {
        async fn transport_ids(
            &self,
            domain: &str,
            ids: &BTreeSet<String>,
        ) -> TransferResult<HashMap<String, String>> {
            if self.unknown_domain {
                return Err(TransferError::UnknownDomain(domain.to_owned()));
            }
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail_first {
                return Err(TransferError::Transient("connection refused".into()));
            }
            Ok(ids
                .iter()
                .enumerate()
                .map(|(i, id)| (id.clone(), format!("tid-{i}")))
                .collect())
        }
    }

    fn patient_bundle() -> ConsentedPatientBundle {
        ConsentedPatientBundle {
            patient: ConsentedPatient::new("p-1", ["policy-a"]),
            bundle: Bundle::new(vec![
                json!({"resourceType": "Patient", "id": "p-1"}),
                json!({"resourceType": "Observation", "subject": {"reference": "Patient/p-1"}}),
            ]),
        }
    }

    #[tokio::test]
    async fn replaces_all_identifiers_and_reports_transport_ids() {
        let deidentifier =
            Stage1Deidentifier::new(Arc::new(FakeProvider::ok()), "research-a", RetryConfig::none());

        let transport = deidentifier
            .deidentify(patient_bundle())
            .await
            .expect("deidentification succeeds");

        assert_eq!(transport.transport_ids, BTreeSet::from(["tid-0".to_owned()]));
        let rendered = serde_json::to_string(&transport.bundle).expect("serialize");
        assert!(!rendered.contains("p-1"));
        assert!(rendered.contains("Patient/tid-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_trust_center_failures() {
        let deidentifier = Stage1Deidentifier::new(
            Arc::new(FakeProvider::flaky(2)),
            "research-a",
            RetryConfig::default(),
        );

        let transport = deidentifier
            .deidentify(patient_bundle())
            .await
            .expect("third attempt succeeds");
        assert_eq!(transport.transport_ids.len(), 1);
    }

    #[tokio::test]
    async fn unknown_domain_propagates_unretried() {
        let deidentifier = Stage1Deidentifier::new(
            Arc::new(FakeProvider::unknown_domain()),
            "research-x",
            RetryConfig::default(),
        );

        let result = deidentifier.deidentify(patient_bundle()).await;
        assert!(matches!(result, Err(TransferError::UnknownDomain(_))));
    }
}
