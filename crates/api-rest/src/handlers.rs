use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use base64::{engine::general_purpose, Engine as _};
use specsheet_core::{
    AuthError, Credentials, DocumentError, DocumentId, DocumentPatch, DocumentType,
    InMemoryFile, NonEmptyText, ProductCategory, Session, UploadOptions, PDF_MIME_TYPE,
};

use crate::dto::{
    DocumentRes, ExportRes, HealthRes, ListDocumentsQuery, ListDocumentsRes, MeRes, SignInReq,
    SignInRes, UpdateDocumentReq, UploadDocumentReq,
};
use crate::AppState;

pub(crate) type ApiError = (StatusCode, String);

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Spec-sheet REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInReq,
    responses(
        (status = 200, description = "Signed in", body = SignInRes),
        (status = 401, description = "Invalid email or password")
    )
)]
#[axum::debug_handler]
pub(crate) async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInReq>,
) -> Result<Json<SignInRes>, ApiError> {
    let session = state
        .store
        .gate()
        .sign_in(&Credentials::new(req.email, req.password))
        .map_err(auth_error)?;

    Ok(Json(SignInRes {
        token: session.token().to_string(),
        email: session.user().email.clone(),
        expires_at: session.expires_at().to_rfc3339(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let session = require_session(&state, &headers)?;
    state.store.gate().sign_out(&session);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Who the bearer token belongs to", body = MeRes)
    )
)]
/// Reports the user behind the bearer token, if any. Never fails.
#[axum::debug_handler]
pub(crate) async fn me(State(state): State<AppState>, headers: HeaderMap) -> Json<MeRes> {
    let user = bearer_token(&headers)
        .and_then(|token| state.store.gate().resolve(token).ok())
        .map(|session| session.user().email.clone());

    Json(MeRes {
        authenticated: user.is_some(),
        email: user,
    })
}

#[utoipa::path(
    get,
    path = "/documents",
    params(ListDocumentsQuery),
    responses(
        (status = 200, description = "Documents, newest first", body = ListDocumentsRes),
        (status = 400, description = "Unknown product type")
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<ListDocumentsRes>, ApiError> {
    let filter = query
        .product_type
        .as_deref()
        .map(str::parse::<ProductCategory>)
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let documents = state
        .store
        .list(filter)
        .into_iter()
        .map(DocumentRes::from)
        .collect();
    Ok(Json(ListDocumentsRes { documents }))
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "The document", body = DocumentRes),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "No such document")
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_document(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<DocumentRes>, ApiError> {
    let id = parse_id(&id)?;
    state
        .store
        .get(&id)
        .map(|d| Json(DocumentRes::from(d)))
        .ok_or_else(|| not_found(&id))
}

#[utoipa::path(
    post,
    path = "/documents",
    request_body = UploadDocumentReq,
    responses(
        (status = 201, description = "Document created", body = DocumentRes),
        (status = 400, description = "Rejected upload"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer" = []))
)]
/// Uploads a PDF. The document type and name are inferred from the filename unless given.
#[axum::debug_handler]
pub(crate) async fn create_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UploadDocumentReq>,
) -> Result<(StatusCode, Json<DocumentRes>), ApiError> {
    let session = require_session(&state, &headers)?;

    let product_type = req
        .product_type
        .parse::<ProductCategory>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let bytes = general_purpose::STANDARD
        .decode(req.content_base64.trim())
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("content_base64 is not valid base64: {}", e),
            )
        })?;

    let mut options = UploadOptions::new(product_type);
    options.description = req.description.unwrap_or_default();
    options.required = req.required.unwrap_or(false);
    options.name = req.name.as_deref().map(parse_text).transpose()?;
    options.document_type = req.document_type.as_deref().map(parse_type).transpose()?;

    let file = InMemoryFile::new(
        req.filename,
        req.content_type.unwrap_or_else(|| PDF_MIME_TYPE.to_string()),
        bytes,
    );
    let document = state
        .store
        .create(&session, &file, options)
        .map_err(document_error)?;

    Ok((StatusCode::CREATED, Json(DocumentRes::from(document))))
}

#[utoipa::path(
    patch,
    path = "/documents/{id}",
    params(("id" = String, Path, description = "Document id")),
    request_body = UpdateDocumentReq,
    responses(
        (status = 204, description = "Document updated"),
        (status = 400, description = "Invalid field value"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No such document")
    ),
    security(("bearer" = []))
)]
/// Edits a document. Product type, content and size cannot be changed.
#[axum::debug_handler]
pub(crate) async fn update_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UpdateDocumentReq>,
) -> Result<StatusCode, ApiError> {
    let session = require_session(&state, &headers)?;
    let id = parse_id(&id)?;

    let patch = DocumentPatch {
        name: req.name.as_deref().map(parse_text).transpose()?,
        description: req.description,
        filename: req.filename.as_deref().map(parse_text).transpose()?,
        document_type: req.document_type.as_deref().map(parse_type).transpose()?,
        required: req.required,
    };

    state
        .store
        .update(&session, &id, &patch)
        .map_err(document_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/documents/{id}",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No such document")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    let session = require_session(&state, &headers)?;
    let id = parse_id(&id)?;
    state
        .store
        .delete(&session, &id)
        .map_err(document_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/documents/{id}/export",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Inline data URL of the content", body = ExportRes),
        (status = 404, description = "Unknown document or content unavailable")
    )
)]
#[axum::debug_handler]
pub(crate) async fn export_document(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<ExportRes>, ApiError> {
    let id = parse_id(&id)?;
    match state.store.export_as_inline_payload(&id).await {
        Some(payload) => Ok(Json(ExportRes { payload })),
        None => Err((
            StatusCode::NOT_FOUND,
            format!("content of document {} is unavailable", id),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/documents/{id}/content",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "The PDF bytes as application/pdf"),
        (status = 404, description = "Unknown document or content not held locally")
    )
)]
#[axum::debug_handler]
pub(crate) async fn document_content(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let bytes = state.store.read_content(&id).ok_or_else(|| not_found(&id))?;
    Ok(([(header::CONTENT_TYPE, PDF_MIME_TYPE)], bytes))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn require_session(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "missing bearer token".to_string()))?;
    state.store.gate().resolve(token).map_err(auth_error)
}

fn parse_id(id: &str) -> Result<DocumentId, ApiError> {
    DocumentId::parse(id).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn parse_text(value: &str) -> Result<NonEmptyText, ApiError> {
    NonEmptyText::new(value).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn parse_type(value: &str) -> Result<DocumentType, ApiError> {
    value
        .parse::<DocumentType>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn not_found(id: &DocumentId) -> ApiError {
    (StatusCode::NOT_FOUND, format!("document not found: {}", id))
}

fn auth_error(e: AuthError) -> ApiError {
    (StatusCode::UNAUTHORIZED, e.to_string())
}

fn document_error(e: DocumentError) -> ApiError {
    match e {
        DocumentError::Validation(_) | DocumentError::InvalidInput(_) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        DocumentError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        DocumentError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, e.to_string()),
        DocumentError::Persistence(_) => {
            tracing::error!("document persistence error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        }
    }
}
