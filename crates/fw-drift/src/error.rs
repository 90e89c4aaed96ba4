use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("baseline {0} references a profile that no longer exists")]
    ProfileNotFound(String),

    #[error(transparent)]
    Profile(#[from] fw_profile::ProfileError),

    #[error(transparent)]
    Store(#[from] fw_store::StoreError),

    #[error("invalid threshold config: {0}")]
    InvalidConfig(#[from] serde_yaml::Error),

    #[error("io error reading threshold config: {0}")]
    Io(#[from] std::io::Error),
}
