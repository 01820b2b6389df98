//! Inline payload encoding.
//!
//! An inline payload is a `data:` URL carrying base64 PDF bytes, for example
//! `data:application/pdf;base64,JVBERi0xLjcK…`. It is self-contained: a browser can display
//! it or hand it to a PDF generator without any further request.

use crate::constants::PDF_MIME_TYPE;
use base64::{engine::general_purpose, Engine as _};

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is not a data URL")]
    NotDataUrl,
    #[error("data URL is not base64 encoded")]
    NotBase64Encoded,
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Encodes PDF bytes as a `data:application/pdf;base64,…` URL.
pub fn encode_data_url(bytes: &[u8]) -> String {
    format!(
        "{}{}{}{}",
        DATA_URL_PREFIX,
        PDF_MIME_TYPE,
        BASE64_MARKER,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Returns true if `reference` is an inline `data:` URL.
pub fn is_data_url(reference: &str) -> bool {
    reference.starts_with(DATA_URL_PREFIX)
}

/// Decodes the bytes of a base64 `data:` URL, whatever media type it declares.
///
/// # Errors
///
/// Returns [`PayloadError`] if the input is not a base64 data URL or the payload is not valid
/// base64.
pub fn decode_data_url(reference: &str) -> Result<Vec<u8>, PayloadError> {
    let rest = reference
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or(PayloadError::NotDataUrl)?;
    let (_media_type, encoded) = rest
        .split_once(BASE64_MARKER)
        .ok_or(PayloadError::NotBase64Encoded)?;
    Ok(general_purpose::STANDARD.decode(encoded.trim())?)
}
