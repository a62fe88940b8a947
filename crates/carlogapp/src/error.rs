use crate::store::RecordKind;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CarlogError {
    #[error("{0} not found: {1}")]
    NotFound(RecordKind, Uuid),

    #[error("{0} already exists: {1}")]
    Duplicate(RecordKind, Uuid),

    #[error("Backup document is invalid: {0}")]
    Decode(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Attachment file error: {0}")]
    File(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CarlogError>;
