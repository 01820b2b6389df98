use specsheet_files::{FilesError, ValidationError};
use specsheet_uuid::DocumentId;

use crate::auth::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("document not found: {0}")]
    NotFound(DocumentId),
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
    #[error("failed to persist documents: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Failures of the durable side of the store.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read document snapshot: {0}")]
    SnapshotRead(std::io::Error),
    #[error("failed to write document snapshot: {0}")]
    SnapshotWrite(std::io::Error),
    #[error("failed to serialize documents: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize documents: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to read document record {path}: {source}", path = path.display())]
    RecordRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write document record: {0}")]
    RecordWrite(std::io::Error),
    #[error("failed to remove document record: {0}")]
    RecordRemove(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML record {path}: {source}", path = path.display())]
    YamlDeserialization {
        path: std::path::PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("record {path} does not belong to its directory", path = path.display())]
    RecordIdMismatch { path: std::path::PathBuf },
    #[error("duplicate document id in snapshot: {0}")]
    DuplicateId(DocumentId),
    #[error("blob storage error: {0}")]
    Blob(#[from] FilesError),
}

pub type DocumentResult<T> = std::result::Result<T, DocumentError>;
