use ptx_api::TransferError;

#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("unknown project: {0}")]
    UnknownProject(String),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}
