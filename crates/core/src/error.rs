use thiserror::Error;

pub type LeadCenterResult<T> = Result<T, LeadCenterError>;

#[derive(Error, Debug)]
pub enum LeadCenterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Field schema error: {0}")]
    Schema(String),

    #[error("Reporting store error: {0}")]
    Store(String),

    #[error("Editing is locked: {0}")]
    EditLocked(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
