//! Spec-sheet file handling
//!
//! This crate owns everything that touches raw PDF bytes before they become a document
//! record:
//!
//! - [`validation`]: acceptance rules for an uploaded candidate (declared MIME type, size
//!   limits, `%PDF` signature)
//! - [`payload`]: self-contained `data:` URL encoding used for inline content and exports
//! - [`blobs`]: content-addressed storage for PDF bytes kept outside the record store
//!
//! ## Blob storage layout
//!
//! ```text
//! <data_dir>/
//! └── blobs/
//!     └── sha256/
//!         └── ab/
//!             └── cd/
//!                 └── abcd3f9e…
//! ```
//!
//! Blobs are immutable. Storing the same bytes twice yields the same hash and a single file,
//! so re-uploading a PDF as a new document never rewrites existing content.

pub mod blobs;
mod constants;
pub mod payload;
pub mod validation;

pub use blobs::{BlobStore, ContentHash};
pub use constants::{
    BLOBS_FOLDER_NAME, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MIN_UPLOAD_BYTES, PDF_MIME_TYPE,
    PDF_SIGNATURE, SIGNATURE_PROBE_LEN,
};
pub use payload::{decode_data_url, encode_data_url, is_data_url, PayloadError};
pub use validation::{
    validate, InMemoryFile, LocalFile, PdfCandidate, ValidationError, ValidationLimits,
};

/// Errors that can occur during blob storage operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Data directory does not exist or could not be created
    #[error("Invalid data directory: {0}")]
    InvalidDataDirectory(String),

    /// Supplied hash is not 64 lowercase hex characters
    #[error("Invalid content hash: {0}")]
    InvalidHash(String),

    /// No blob is stored under the requested hash
    #[error("Blob not found for hash: {0}")]
    BlobNotFound(String),

    /// Stored bytes no longer hash to their file name
    #[error("Blob {0} failed integrity check")]
    IntegrityMismatch(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
