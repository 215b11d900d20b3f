//! Immutable per-project receiving configuration.

use std::sync::Arc;

use ptx_api::BundlePersister;

use crate::deidentify::Deidentifier;

/// Everything one project's receiving pipeline needs, assembled once at
/// startup and shared across requests.
pub struct TransferProcess {
    pub project: String,
    pub domain: String,
    pub deidentifier: Arc<dyn Deidentifier>,
    pub persister: Arc<dyn BundlePersister>,
}
