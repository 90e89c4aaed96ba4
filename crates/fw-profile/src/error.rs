use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("insufficient data: {have} runs in window, need at least {need}")]
    InsufficientData { have: u64, need: u64 },

    #[error(transparent)]
    Store(#[from] fw_store::StoreError),
}
