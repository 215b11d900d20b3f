//! Contracts against external collaborators and cross-agent services.
//!
//! The consent registry, the clinical data store, and the downstream
//! persistence target are not implemented by this system; the agents program
//! against these seams and any conforming implementation can be wired in.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::bundle::Bundle;
use crate::patient::{ConsentedPatient, ConsentedPatientBundle};
use crate::transport::TransportBundle;
use crate::{TransferError, TransferResult};

/// Yields the consented cohort of a transfer process.
///
/// The stream is lazy and restartable per run. An `Err` item is a failure of
/// the cohort source itself and terminates the run with ERROR status, unlike
/// per-patient pipeline failures which are contained downstream.
pub trait CohortSelector: Send + Sync {
    fn select_cohort(&self) -> BoxStream<'static, Result<ConsentedPatient, TransferError>>;
}

/// Maps a consented patient to their raw clinical bundle.
#[async_trait]
pub trait DataSelector: Send + Sync {
    async fn select(&self, patient: &ConsentedPatient) -> TransferResult<Bundle>;
}

/// Issues transport ids for original identifiers, scoped to a consent domain.
///
/// Implemented by the trust-center client on the sending side and by the
/// issuer itself inside the trust center.
#[async_trait]
pub trait TransportIdProvider: Send + Sync {
    /// Returns the original-id → transport-id mapping.
    async fn transport_ids(
        &self,
        domain: &str,
        ids: &BTreeSet<String>,
    ) -> TransferResult<HashMap<String, String>>;
}

/// Resolves transport ids back to durable pseudonyms.
///
/// The result may be partial: ids with no stored association are simply
/// absent, never an error.
#[async_trait]
pub trait PseudonymResolver: Send + Sync {
    async fn resolve(
        &self,
        domain: &str,
        transport_ids: &BTreeSet<String>,
    ) -> TransferResult<HashMap<String, String>>;
}

/// Outcome of transmitting one transport bundle to the receiving agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SendOutcome {
    pub bundles_sent: usize,
}

/// Transmits a transport bundle from the sending to the receiving agent.
#[async_trait]
pub trait TransportBundleSender: Send + Sync {
    async fn send(&self, bundle: TransportBundle) -> TransferResult<SendOutcome>;
}

/// Persists a fully deidentified bundle at the research side.
#[async_trait]
pub trait BundlePersister: Send + Sync {
    /// Returns the count of resources actually persisted.
    async fn persist(&self, bundle: Bundle) -> TransferResult<usize>;
}

/// A cohort selector over a fixed, pre-consented patient list.
///
/// Useful for pilot setups and tests; production deployments plug a consent
/// registry behind [`CohortSelector`] instead.
pub struct PinnedCohortSelector {
    patients: Vec<ConsentedPatient>,
}

impl PinnedCohortSelector {
    pub fn new(patients: Vec<ConsentedPatient>) -> Self {
        Self { patients }
    }
}

impl CohortSelector for PinnedCohortSelector {
    fn select_cohort(&self) -> BoxStream<'static, Result<ConsentedPatient, TransferError>> {
        use futures::StreamExt;
        futures::stream::iter(self.patients.clone().into_iter().map(Ok)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn pinned_cohort_restarts_per_run() {
        let selector = PinnedCohortSelector::new(vec![
            ConsentedPatient::new("p-1", ["policy-a"]),
            ConsentedPatient::new("p-2", ["policy-a"]),
        ]);

        for _ in 0..2 {
            let cohort: Vec<_> = selector.select_cohort().collect().await;
            assert_eq!(cohort.len(), 2);
            assert!(cohort.iter().all(Result::is_ok));
        }
    }
}
