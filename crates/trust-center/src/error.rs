use ptx_util::retry::RetryClassify;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum TrustCenterError {
    /// The external pseudonymization service does not know the requested
    /// consent domain. Kept distinct so callers can branch on it.
    #[error("unknown consent domain: {0}")]
    UnknownDomain(String),
    /// Could not find an unoccupied transport id within the attempt bound.
    #[error("failed to allocate an unoccupied transport id after {0} attempts")]
    TransportIdExhausted(u32),
    /// Lost the insert-if-absent race on a store key. A mapping must never be
    /// overwritten, so the whole issuance unit of work aborts.
    #[error("transport-id store already holds an association for {0}")]
    StoreConsistency(String),
    #[error("pseudonymization service request failed: {0}")]
    Upstream(String),
    #[error("pseudonymization service returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("transient pseudonymization service failure: {0}")]
    Transient(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TrustCenterResult<T> = std::result::Result<T, TrustCenterError>;

impl RetryClassify for TrustCenterError {
    fn is_transient(&self) -> bool {
        matches!(self, TrustCenterError::Transient(_))
    }
}
