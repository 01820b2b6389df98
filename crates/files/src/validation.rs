//! Upload validation.
//!
//! [`validate`] applies four rules in a fixed order and reports the first failure:
//!
//! 1. the declared content type must be `application/pdf`
//! 2. the size must not exceed [`ValidationLimits::max_bytes`]
//! 3. the size must be at least [`ValidationLimits::min_bytes`]
//! 4. the first [`SIGNATURE_PROBE_LEN`] bytes must begin with `%PDF`
//!
//! Only rule 4 touches the content, and only through [`PdfCandidate::read_head`]. A failed
//! read is reported as [`ValidationError::Unreadable`], distinct from a bad signature.

use crate::constants::{
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MIN_UPLOAD_BYTES, PDF_MIME_TYPE, PDF_SIGNATURE,
    SIGNATURE_PROBE_LEN,
};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Why an upload was rejected.
///
/// The `Display` output is phrased for the person who picked the file.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File must be a PDF document (got '{content_type}')")]
    NotPdf { content_type: String },

    #[error("File is too large: {size} bytes exceeds the {} limit", human_bytes(.max))]
    TooLarge { size: u64, max: u64 },

    #[error("File is too small: {size} bytes is below the {} minimum", human_bytes(.min))]
    TooSmall { size: u64, min: u64 },

    #[error("File does not look like a PDF (missing %PDF header)")]
    InvalidSignature,

    #[error("File could not be read: {0}")]
    Unreadable(#[source] io::Error),
}

/// Size limits applied by [`validate`]. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_bytes: u64,
    pub min_bytes: u64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            min_bytes: DEFAULT_MIN_UPLOAD_BYTES,
        }
    }
}

/// A file offered for upload.
///
/// The declared content type and size come from whoever supplied the file (a browser form,
/// an API request, the CLI) and are checked before any content is read.
pub trait PdfCandidate {
    /// Original filename, used for classification.
    fn filename(&self) -> &str;

    /// Content type declared by the uploader.
    fn content_type(&self) -> &str;

    /// Size in bytes declared by the uploader.
    fn size(&self) -> u64;

    /// Reads up to `len` leading bytes.
    fn read_head(&self, len: usize) -> io::Result<Vec<u8>>;

    /// Reads the complete payload.
    fn read_all(&self) -> io::Result<Vec<u8>>;
}

/// Checks `candidate` against `limits`. Performs no writes.
///
/// # Errors
///
/// Returns the first [`ValidationError`] in rule order.
pub fn validate(
    candidate: &dyn PdfCandidate,
    limits: &ValidationLimits,
) -> Result<(), ValidationError> {
    if candidate.content_type() != PDF_MIME_TYPE {
        return Err(ValidationError::NotPdf {
            content_type: candidate.content_type().to_owned(),
        });
    }

    let size = candidate.size();
    if size > limits.max_bytes {
        return Err(ValidationError::TooLarge {
            size,
            max: limits.max_bytes,
        });
    }
    if size < limits.min_bytes {
        return Err(ValidationError::TooSmall {
            size,
            min: limits.min_bytes,
        });
    }

    let head = candidate
        .read_head(SIGNATURE_PROBE_LEN)
        .map_err(ValidationError::Unreadable)?;
    if !head.starts_with(PDF_SIGNATURE) {
        return Err(ValidationError::InvalidSignature);
    }

    Ok(())
}

/// An upload whose bytes are already in memory (API request bodies).
#[derive(Debug, Clone)]
pub struct InMemoryFile {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl InMemoryFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl PdfCandidate for InMemoryFile {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_head(&self, len: usize) -> io::Result<Vec<u8>> {
        Ok(self.bytes[..len.min(self.bytes.len())].to_vec())
    }

    fn read_all(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// An upload read lazily from the local filesystem (CLI).
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    filename: String,
    content_type: String,
    size: u64,
}

impl LocalFile {
    /// Opens `path` with an explicitly declared content type.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file metadata cannot be read or the path is not a file.
    pub fn new(path: &Path, content_type: impl Into<String>) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("file name is not valid UTF-8: {}", path.display()),
                )
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            filename,
            content_type: content_type.into(),
            size: metadata.len(),
        })
    }

    /// Opens `path` and declares the content type detected from its magic bytes.
    ///
    /// Detection is best-effort; undetectable content is declared as
    /// `application/octet-stream` and will be rejected by [`validate`].
    pub fn detect(path: &Path) -> io::Result<Self> {
        let content_type = infer::get_from_path(path)?
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");
        tracing::debug!("detected content type {} for {}", content_type, path.display());
        Self::new(path, content_type)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PdfCandidate for LocalFile {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_head(&self, len: usize) -> io::Result<Vec<u8>> {
        let file = fs::File::open(&self.path)?;
        let mut head = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut head)?;
        Ok(head)
    }

    fn read_all(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

fn human_bytes(bytes: &u64) -> String {
    let bytes = *bytes;
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{} KiB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}
