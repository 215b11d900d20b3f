//! Immutable per-project transfer configuration.

use std::collections::BTreeSet;
use std::sync::Arc;

use ptx_api::{CohortSelector, DataSelector, TransportBundleSender};

use crate::deidentify::Deidentifier;

/// Everything a run needs, assembled once at startup and shared by every run
/// of the same project.
pub struct TransferProcess {
    pub project: String,
    pub domain: String,
    pub policies: BTreeSet<String>,
    pub cohort_selector: Arc<dyn CohortSelector>,
    pub data_selector: Arc<dyn DataSelector>,
    pub deidentifier: Arc<dyn Deidentifier>,
    pub bundle_sender: Arc<dyn TransportBundleSender>,
}
