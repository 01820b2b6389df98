//! Request and response bodies.
//!
//! Timestamps are RFC 3339 strings and enums are their lower-case codes, so the JSON matches
//! the `documents` table rows.

use serde::{Deserialize, Serialize};
use specsheet_core::Document;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignInReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignInRes {
    pub token: String,
    pub email: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeRes {
    pub authenticated: bool,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentRes {
    pub id: String,
    pub name: String,
    pub description: String,
    pub filename: String,
    pub file_url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub document_type: String,
    pub product_type: String,
    pub required: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentRes {
    fn from(d: Document) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name.into_string(),
            description: d.description,
            filename: d.filename.into_string(),
            file_url: d.file_url.to_string(),
            size: d.size,
            document_type: d.document_type.code().to_string(),
            product_type: d.product_type.code().to_string(),
            required: d.required,
            created_at: d.created_at.to_rfc3339(),
            updated_at: d.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListDocumentsRes {
    pub documents: Vec<DocumentRes>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDocumentsQuery {
    /// One of `ceilings`, `walls`, `baffles`, `clouds`, `other`.
    pub product_type: Option<String>,
}

/// A PDF upload. `content_base64` carries the file bytes.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadDocumentReq {
    pub filename: String,
    /// Declared MIME type; defaults to `application/pdf`.
    pub content_type: Option<String>,
    pub content_base64: String,
    pub product_type: String,
    pub description: Option<String>,
    pub required: Option<bool>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub document_type: Option<String>,
}

/// Editable fields. Anything else in the body is ignored.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateDocumentReq {
    pub name: Option<String>,
    pub description: Option<String>,
    pub filename: Option<String>,
    #[serde(rename = "type")]
    pub document_type: Option<String>,
    pub required: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExportRes {
    pub payload: String,
}
