//! The document record and the values used to create and edit it.
//!
//! Field names of [`Document`] are the column names of the `documents` table (see
//! [`crate::schema`]), so a serialized record can be inserted into the hosted backend as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use specsheet_files::{is_data_url, BlobStore, ContentHash, FilesError};
use specsheet_types::{DocumentType, NonEmptyText, ProductCategory};
use specsheet_uuid::DocumentId;
use std::{fmt, str::FromStr};

/// A single PDF asset plus its descriptive metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: NonEmptyText,
    #[serde(default)]
    pub description: String,
    pub filename: NonEmptyText,
    pub file_url: ContentRef,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub product_type: ProductCategory,
    #[serde(default)]
    pub required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a document's bytes live.
///
/// Stored as a single string in `file_url`:
/// - `data:application/pdf;base64,…` for inline content
/// - `sha256:<hex>` for content in the local blob store
/// - `http://…` or `https://…` for remotely hosted content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRef {
    Inline(String),
    Blob(ContentHash),
    Remote(String),
}

const BLOB_PREFIX: &str = "sha256:";

impl ContentRef {
    /// Short form for logs; never prints inline payloads.
    pub fn describe(&self) -> String {
        match self {
            ContentRef::Inline(data) => format!("inline ({} chars)", data.len()),
            ContentRef::Blob(hash) => BlobStore::relative_path(hash),
            ContentRef::Remote(url) => url.clone(),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentRef::Inline(data) => f.write_str(data),
            ContentRef::Blob(hash) => write!(f, "{}{}", BLOB_PREFIX, hash),
            ContentRef::Remote(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentRefError {
    #[error("invalid blob reference: {0}")]
    Blob(#[from] FilesError),
    #[error("unsupported content reference: '{0}'")]
    Unsupported(String),
}

impl FromStr for ContentRef {
    type Err = ContentRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_data_url(s) {
            return Ok(ContentRef::Inline(s.to_owned()));
        }
        if let Some(hex) = s.strip_prefix(BLOB_PREFIX) {
            return Ok(ContentRef::Blob(ContentHash::parse(hex)?));
        }
        if s.starts_with("https://") || s.starts_with("http://") {
            return Ok(ContentRef::Remote(s.to_owned()));
        }
        let preview: String = s.chars().take(32).collect();
        Err(ContentRefError::Unsupported(preview))
    }
}

impl Serialize for ContentRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Caller-supplied metadata for a new upload.
///
/// `name` and `document_type` override what the classifier infers from the filename.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub product_type: ProductCategory,
    pub description: String,
    pub required: bool,
    pub name: Option<NonEmptyText>,
    pub document_type: Option<DocumentType>,
}

impl UploadOptions {
    pub fn new(product_type: ProductCategory) -> Self {
        Self {
            product_type,
            description: String::new(),
            required: false,
            name: None,
            document_type: None,
        }
    }
}

/// Editable fields of a stored document. `None` leaves a field unchanged.
///
/// Identity, product category, content reference and size are deliberately absent: they are
/// fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentPatch {
    pub name: Option<NonEmptyText>,
    pub description: Option<String>,
    pub filename: Option<NonEmptyText>,
    #[serde(rename = "type")]
    pub document_type: Option<DocumentType>,
    pub required: Option<bool>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        *self == DocumentPatch::default()
    }

    /// Merges the patch over `document` and stamps `updated_at`.
    pub(crate) fn apply(&self, document: &mut Document, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            document.name = name.clone();
        }
        if let Some(description) = &self.description {
            document.description = description.clone();
        }
        if let Some(filename) = &self.filename {
            document.filename = filename.clone();
        }
        if let Some(document_type) = self.document_type {
            document.document_type = document_type;
        }
        if let Some(required) = self.required {
            document.required = required;
        }
        document.updated_at = now;
    }
}
