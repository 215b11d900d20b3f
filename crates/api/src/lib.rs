//! # PTX API
//!
//! Shared domain model for the patient-transfer agents.
//!
//! This crate contains the types that cross agent boundaries and the contracts
//! against external collaborators:
//! - `Bundle`, `ConsentedPatient` and the `TransportBundle` wire artifact
//! - identifier enumeration and substitution used by both deidentification stages
//! - collaborator traits (cohort selection, data selection, transmission)
//! - trust-center request/response wire types
//!
//! **No transport concerns**: HTTP clients and servers belong in the agent
//! crates; this crate stays free of axum and reqwest.

pub mod bundle;
pub mod patient;
pub mod tca;
pub mod traits;
pub mod transport;

pub use bundle::{protected_ids, replace_ids, Bundle};
pub use patient::{ConsentedPatient, ConsentedPatientBundle};
pub use traits::{BundlePersister, CohortSelector, DataSelector, PseudonymResolver, SendOutcome, TransportBundleSender, TransportIdProvider};
pub use transport::TransportBundle;

use ptx_util::retry::RetryClassify;

/// Failures crossing a collaborator boundary.
///
/// The variants follow the system-wide taxonomy: transient transport failures
/// are the only retryable kind; an unknown consent domain is kept distinct so
/// callers can branch on it.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transient transport failure: {0}")]
    Transient(String),
    #[error("unknown consent domain: {0}")]
    UnknownDomain(String),
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("malformed upstream payload: {0}")]
    InvalidPayload(String),
    #[error("cohort selection failed: {0}")]
    Cohort(String),
}

pub type TransferResult<T> = std::result::Result<T, TransferError>;

impl RetryClassify for TransferError {
    fn is_transient(&self) -> bool {
        matches!(self, TransferError::Transient(_))
    }
}
