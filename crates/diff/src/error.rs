use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("invalid diff options: {0}")]
    Options(#[from] serde_json::Error),
}
