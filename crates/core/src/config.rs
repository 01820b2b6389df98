//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the store and the
//! access gate. Services never read process-wide environment variables themselves; the
//! binaries hand a lookup function to [`StoreConfig::from_lookup`] and
//! [`AuthConfig::from_lookup`] instead, which keeps tests free of global state.

use crate::constants::{
    DEFAULT_DATA_DIR, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_SESSION_TTL_MINS, RECORDS_DIR_NAME,
    SNAPSHOT_FILENAME,
};
use crate::{DocumentError, DocumentResult};
use specsheet_files::ValidationLimits;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// How the collection is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// One JSON file holding the whole collection, rewritten on every mutation.
    Snapshot,
    /// One YAML file per document, written individually.
    Records,
}

impl FromStr for StorageKind {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapshot" => Ok(StorageKind::Snapshot),
            "records" => Ok(StorageKind::Records),
            other => Err(DocumentError::InvalidInput(format!(
                "unknown storage kind '{}' (expected 'snapshot' or 'records')",
                other
            ))),
        }
    }
}

/// Where uploaded bytes are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    /// Embedded in the record as a base64 `data:` URL.
    Inline,
    /// Written to the content-addressed blob store; the record holds the hash.
    Blob,
}

impl FromStr for ContentMode {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(ContentMode::Inline),
            "blob" => Ok(ContentMode::Blob),
            other => Err(DocumentError::InvalidInput(format!(
                "unknown content mode '{}' (expected 'inline' or 'blob')",
                other
            ))),
        }
    }
}

/// Document store configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    data_dir: PathBuf,
    storage: StorageKind,
    content_mode: ContentMode,
    limits: ValidationLimits,
    fetch_timeout: Duration,
}

impl StoreConfig {
    /// Create a new `StoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidInput`] if the size limits are inverted or the fetch
    /// timeout is zero.
    pub fn new(
        data_dir: PathBuf,
        storage: StorageKind,
        content_mode: ContentMode,
        limits: ValidationLimits,
        fetch_timeout: Duration,
    ) -> DocumentResult<Self> {
        if limits.min_bytes > limits.max_bytes {
            return Err(DocumentError::InvalidInput(format!(
                "minimum upload size {} exceeds maximum {}",
                limits.min_bytes, limits.max_bytes
            )));
        }
        if fetch_timeout.is_zero() {
            return Err(DocumentError::InvalidInput(
                "fetch timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            data_dir,
            storage,
            content_mode,
            limits,
            fetch_timeout,
        })
    }

    /// Defaults for everything except the data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            storage: StorageKind::Records,
            content_mode: ContentMode::Blob,
            limits: ValidationLimits::default(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    /// Resolve configuration from `SPECSHEET_*` variables supplied by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DocumentResult<Self> {
        let data_dir = non_empty(lookup("SPECSHEET_DATA_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let storage = non_empty(lookup("SPECSHEET_STORAGE"))
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(StorageKind::Records);
        let content_mode = non_empty(lookup("SPECSHEET_CONTENT"))
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(ContentMode::Blob);

        let defaults = ValidationLimits::default();
        let limits = ValidationLimits {
            max_bytes: number_from_env_value(
                "SPECSHEET_MAX_UPLOAD_BYTES",
                lookup("SPECSHEET_MAX_UPLOAD_BYTES"),
                defaults.max_bytes,
            )?,
            min_bytes: number_from_env_value(
                "SPECSHEET_MIN_UPLOAD_BYTES",
                lookup("SPECSHEET_MIN_UPLOAD_BYTES"),
                defaults.min_bytes,
            )?,
        };
        let fetch_timeout = Duration::from_secs(number_from_env_value(
            "SPECSHEET_FETCH_TIMEOUT_SECS",
            lookup("SPECSHEET_FETCH_TIMEOUT_SECS"),
            DEFAULT_FETCH_TIMEOUT_SECS,
        )?);

        Self::new(data_dir, storage, content_mode, limits, fetch_timeout)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    pub fn content_mode(&self) -> ContentMode {
        self.content_mode
    }

    pub fn limits(&self) -> ValidationLimits {
        self.limits
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILENAME)
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join(RECORDS_DIR_NAME)
    }
}

/// Admin credentials and session lifetime.
#[derive(Clone)]
pub struct AuthConfig {
    admin_email: String,
    admin_password: String,
    session_ttl: chrono::Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

impl AuthConfig {
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidInput`] if the email or password is blank or the TTL is
    /// not positive.
    pub fn new(
        admin_email: String,
        admin_password: String,
        session_ttl: chrono::Duration,
    ) -> DocumentResult<Self> {
        if admin_email.trim().is_empty() {
            return Err(DocumentError::InvalidInput(
                "admin email cannot be empty".into(),
            ));
        }
        if admin_password.is_empty() {
            return Err(DocumentError::InvalidInput(
                "admin password cannot be empty".into(),
            ));
        }
        if session_ttl <= chrono::Duration::zero() {
            return Err(DocumentError::InvalidInput(
                "session lifetime must be positive".into(),
            ));
        }

        Ok(Self {
            admin_email: admin_email.trim().to_owned(),
            admin_password,
            session_ttl,
        })
    }

    /// Resolve credentials from `SPECSHEET_ADMIN_EMAIL`, `SPECSHEET_ADMIN_PASSWORD` and
    /// `SPECSHEET_SESSION_TTL_MINS`. Email and password are required.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DocumentResult<Self> {
        let admin_email = non_empty(lookup("SPECSHEET_ADMIN_EMAIL")).ok_or_else(|| {
            DocumentError::InvalidInput("SPECSHEET_ADMIN_EMAIL is not set".into())
        })?;
        let admin_password = lookup("SPECSHEET_ADMIN_PASSWORD")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                DocumentError::InvalidInput("SPECSHEET_ADMIN_PASSWORD is not set".into())
            })?;
        let ttl_mins = number_from_env_value(
            "SPECSHEET_SESSION_TTL_MINS",
            lookup("SPECSHEET_SESSION_TTL_MINS"),
            DEFAULT_SESSION_TTL_MINS as u64,
        )?;
        let ttl_mins = i64::try_from(ttl_mins).map_err(|_| {
            DocumentError::InvalidInput("SPECSHEET_SESSION_TTL_MINS is out of range".into())
        })?;

        Self::new(
            admin_email,
            admin_password,
            chrono::Duration::minutes(ttl_mins),
        )
    }

    /// Like [`AuthConfig::from_lookup`], but `Ok(None)` when neither the admin email nor the
    /// admin password is set. Malformed values are still errors.
    pub fn from_lookup_optional(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> DocumentResult<Option<Self>> {
        let email = non_empty(lookup("SPECSHEET_ADMIN_EMAIL"));
        let password = lookup("SPECSHEET_ADMIN_PASSWORD").filter(|v| !v.is_empty());
        if email.is_none() && password.is_none() {
            return Ok(None);
        }
        Self::from_lookup(lookup).map(Some)
    }

    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        self.session_ttl
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an unsigned number from an optional env value, falling back to `default` when the
/// value is absent or blank.
pub fn number_from_env_value(name: &str, value: Option<String>, default: u64) -> DocumentResult<u64> {
    match non_empty(value) {
        None => Ok(default),
        Some(v) => v.parse::<u64>().map_err(|e| {
            DocumentError::InvalidInput(format!("{} must be a non-negative integer: {}", name, e))
        }),
    }
}
