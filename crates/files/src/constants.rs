//! Constants shared by validation and storage.

/// The only MIME type accepted for uploads.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Literal every PDF file starts with.
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Number of leading bytes read when checking the signature.
pub const SIGNATURE_PROBE_LEN: usize = 5;

/// Largest accepted upload (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Smallest accepted upload (1 KiB).
pub const DEFAULT_MIN_UPLOAD_BYTES: u64 = 1024;

/// Directory name for content-addressed blob storage under the data directory.
pub const BLOBS_FOLDER_NAME: &str = "blobs";
