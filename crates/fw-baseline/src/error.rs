use thiserror::Error;

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("baseline {0} not found")]
    NotFound(String),

    #[error("a baseline already exists for profile {0}")]
    AlreadyExists(String),

    #[error("invalid baseline type '{0}'")]
    InvalidBaselineType(String),

    #[error("description rejected: {0}")]
    DescriptionRejected(#[from] fw_model::PrivacyError),

    #[error(transparent)]
    Store(#[from] fw_store::StoreError),
}
