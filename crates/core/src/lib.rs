//! # Spec-sheet Core
//!
//! Core business logic for the spec-sheet document service.
//!
//! This crate owns the document lifecycle:
//! - filename classification into a [`DocumentType`] and display name
//! - the [`DocumentStore`]: an in-memory collection persisted on every mutation, either as a
//!   whole-collection JSON snapshot or as one YAML file per record
//! - the [`AccessGate`]: session-based authorisation for mutations
//! - best-effort export of document content as an inline `data:` URL
//!
//! **No API concerns**: HTTP routing and command-line parsing belong in `api-rest` and `cli`.

pub mod auth;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod export;
pub mod schema;
pub mod storage;
pub mod store;

pub use auth::{
    AccessGate, AuthError, AuthEvent, AuthProvider, AuthResult, Credentials, Session,
    StaticCredentialsProvider, Subscription, User,
};
pub use classifier::{classify, Classification};
pub use config::{AuthConfig, ContentMode, StorageKind, StoreConfig};
pub use constants::DEFAULT_DATA_DIR;
pub use document::{ContentRef, Document, DocumentPatch, UploadOptions};
pub use error::{DocumentError, DocumentResult, PersistenceError};
pub use export::{ContentFetcher, FetchError, HttpFetcher};
pub use store::DocumentStore;

pub use specsheet_files::{
    InMemoryFile, LocalFile, PdfCandidate, ValidationError, ValidationLimits, PDF_MIME_TYPE,
};
pub use specsheet_types::{DocumentType, NonEmptyText, ProductCategory};
pub use specsheet_uuid::DocumentId;
