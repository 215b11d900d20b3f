use ptx_api::TransferError;

#[derive(Debug, thiserror::Error)]
pub enum ClinicalError {
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("unknown project: {0}")]
    UnknownProject(String),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

pub type ClinicalResult<T> = std::result::Result<T, ClinicalError>;
