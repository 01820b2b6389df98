//! # API REST
//!
//! REST API for the spec-sheet document service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, bearer tokens, CORS, status codes)
//!
//! Reads are public. Mutations need an `Authorization: Bearer <token>` header carrying a token
//! from `POST /auth/sign-in`.

#![warn(rust_2018_idioms)]

mod dto;
mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use specsheet_core::{DocumentStore, ValidationLimits};

pub use dto::{
    DocumentRes, ExportRes, HealthRes, ListDocumentsRes, MeRes, SignInReq, SignInRes,
    UpdateDocumentReq, UploadDocumentReq,
};

/// Headroom on top of the base64-expanded upload limit for the other JSON fields.
const BODY_LIMIT_OVERHEAD: usize = 64 * 1024;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    store: Arc<DocumentStore>,
    body_limit: usize,
}

impl AppState {
    /// `limits` sizes the request body limit so the largest accepted PDF still fits once
    /// base64 encoded.
    pub fn new(store: Arc<DocumentStore>, limits: ValidationLimits) -> Self {
        let encoded = usize::try_from(limits.max_bytes.div_ceil(3).saturating_mul(4))
            .unwrap_or(usize::MAX);
        Self {
            store,
            body_limit: encoded.saturating_add(BODY_LIMIT_OVERHEAD),
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::sign_in,
        handlers::sign_out,
        handlers::me,
        handlers::list_documents,
        handlers::get_document,
        handlers::create_document,
        handlers::update_document,
        handlers::delete_document,
        handlers::export_document,
        handlers::document_content,
    ),
    components(schemas(
        HealthRes,
        SignInReq,
        SignInRes,
        MeRes,
        DocumentRes,
        ListDocumentsRes,
        UploadDocumentReq,
        UpdateDocumentReq,
        ExportRes,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Builds the application router, including Swagger UI at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    let body_limit = state.body_limit;
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/sign-in", post(handlers::sign_in))
        .route("/auth/sign-out", post(handlers::sign_out))
        .route("/auth/me", get(handlers::me))
        .route(
            "/documents",
            get(handlers::list_documents).post(handlers::create_document),
        )
        .route(
            "/documents/:id",
            get(handlers::get_document)
                .patch(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route("/documents/:id/export", get(handlers::export_document))
        .route("/documents/:id/content", get(handlers::document_content))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use base64::{engine::general_purpose, Engine as _};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use specsheet_core::{
        AccessGate, ContentMode, HttpFetcher, StaticCredentialsProvider, StorageKind,
        StoreConfig,
    };
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const EMAIL: &str = "admin@example.com";
    const PASSWORD: &str = "s3cret";

    struct TestApp {
        _temp: TempDir,
        state: AppState,
    }

    impl TestApp {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let cfg = StoreConfig::new(
                temp.path().to_path_buf(),
                StorageKind::Records,
                ContentMode::Blob,
                ValidationLimits::default(),
                Duration::from_secs(1),
            )
            .unwrap();
            let gate = Arc::new(AccessGate::new(
                Box::new(StaticCredentialsProvider::new(EMAIL, PASSWORD)),
                chrono::Duration::hours(1),
            ));
            let store =
                DocumentStore::open(&cfg, gate, Arc::new(HttpFetcher::default())).unwrap();
            Self {
                _temp: temp,
                state: AppState::new(Arc::new(store), cfg.limits()),
            }
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
            let response = router(self.state.clone()).oneshot(request).await.unwrap();
            let status = response.status();
            let body = response.into_body().collect().await.unwrap().to_bytes();
            (status, body.to_vec())
        }

        async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
            let (status, body) = self.send(request).await;
            let value = if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&body).unwrap_or(Value::String(
                    String::from_utf8_lossy(&body).into_owned(),
                ))
            };
            (status, value)
        }

        async fn token(&self) -> String {
            let (status, body) = self
                .json(json_request(
                    Method::POST,
                    "/auth/sign-in",
                    None,
                    json!({"email": EMAIL, "password": PASSWORD}),
                ))
                .await;
            assert_eq!(status, StatusCode::OK);
            body["token"].as_str().unwrap().to_string()
        }

        async fn upload(&self, token: &str, filename: &str, product_type: &str) -> Value {
            let (status, body) = self
                .json(json_request(
                    Method::POST,
                    "/documents",
                    Some(token),
                    upload_body(filename, product_type),
                ))
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body
        }
    }

    fn pdf_bytes() -> Vec<u8> {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.resize(2048, b'0');
        bytes
    }

    fn upload_body(filename: &str, product_type: &str) -> Value {
        json!({
            "filename": filename,
            "content_base64": general_purpose::STANDARD.encode(pdf_bytes()),
            "product_type": product_type,
        })
    }

    fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = TestApp::new();
        let (status, body) = app.json(empty_request(Method::GET, "/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn sign_in_rejects_bad_password() {
        let app = TestApp::new();
        let (status, _) = app
            .json(json_request(
                Method::POST,
                "/auth/sign-in",
                None,
                json!({"email": EMAIL, "password": "nope"}),
            ))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_reflects_bearer_token() {
        let app = TestApp::new();
        let (_, anonymous) = app.json(empty_request(Method::GET, "/auth/me", None)).await;
        assert_eq!(anonymous["authenticated"], false);

        let token = app.token().await;
        let (_, me) = app
            .json(empty_request(Method::GET, "/auth/me", Some(&token)))
            .await;
        assert_eq!(me["authenticated"], true);
        assert_eq!(me["email"], EMAIL);

        let (status, _) = app
            .send(empty_request(Method::POST, "/auth/sign-out", Some(&token)))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, after) = app
            .json(empty_request(Method::GET, "/auth/me", Some(&token)))
            .await;
        assert_eq!(after["authenticated"], false);
    }

    #[tokio::test]
    async fn upload_requires_bearer_token() {
        let app = TestApp::new();
        let (status, _) = app
            .send(json_request(
                Method::POST,
                "/documents",
                None,
                upload_body("tds.pdf", "ceilings"),
            ))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(json_request(
                Method::POST,
                "/documents",
                Some("not-a-session"),
                upload_body("tds.pdf", "ceilings"),
            ))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upload_then_get_and_list() {
        let app = TestApp::new();
        let token = app.token().await;

        let created = app.upload(&token, "install-guide-v2.PDF", "walls").await;
        assert_eq!(created["type"], "installation");
        assert_eq!(created["name"], "Installation Guide");
        assert_eq!(created["product_type"], "walls");
        assert_eq!(created["size"], 2048);
        app.upload(&token, "ceiling-tds.pdf", "ceilings").await;

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = app
            .json(empty_request(Method::GET, &format!("/documents/{id}"), None))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (_, all) = app.json(empty_request(Method::GET, "/documents", None)).await;
        assert_eq!(all["documents"].as_array().unwrap().len(), 2);

        let (_, walls) = app
            .json(empty_request(Method::GET, "/documents?product_type=walls", None))
            .await;
        assert_eq!(walls["documents"].as_array().unwrap().len(), 1);
        assert_eq!(walls["documents"][0]["id"], id);

        let (status, _) = app
            .send(empty_request(Method::GET, "/documents?product_type=floors", None))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_rejections_carry_the_reason() {
        let app = TestApp::new();
        let token = app.token().await;

        let mut body = upload_body("photo.pdf", "ceilings");
        body["content_type"] = json!("image/png");
        let (status, message) = app
            .send(json_request(Method::POST, "/documents", Some(&token), body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(message)
            .unwrap()
            .starts_with("File must be a PDF document"));

        let body = json!({
            "filename": "fake.pdf",
            "content_base64": general_purpose::STANDARD.encode(vec![b'x'; 2048]),
            "product_type": "ceilings",
        });
        let (status, _) = app
            .send(json_request(Method::POST, "/documents", Some(&token), body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, all) = app.json(empty_request(Method::GET, "/documents", None)).await;
        assert!(all["documents"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn patch_ignores_product_type() {
        let app = TestApp::new();
        let token = app.token().await;
        let created = app.upload(&token, "warranty.pdf", "clouds").await;
        let uri = format!("/documents/{}", created["id"].as_str().unwrap());

        let (status, _) = app
            .send(json_request(
                Method::PATCH,
                &uri,
                Some(&token),
                json!({"product_type": "other", "required": true, "description": "10 years"}),
            ))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, fetched) = app.json(empty_request(Method::GET, &uri, None)).await;
        assert_eq!(fetched["product_type"], "clouds");
        assert_eq!(fetched["required"], true);
        assert_eq!(fetched["description"], "10 years");
        assert_eq!(fetched["type"], "warranty");
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let app = TestApp::new();
        let token = app.token().await;
        let created = app.upload(&token, "msds.pdf", "baffles").await;
        let uri = format!("/documents/{}", created["id"].as_str().unwrap());

        let (status, _) = app
            .send(empty_request(Method::DELETE, &uri, Some(&token)))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app
            .send(empty_request(Method::DELETE, &uri, Some(&token)))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.send(empty_request(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn export_and_content_return_the_pdf() {
        let app = TestApp::new();
        let token = app.token().await;
        let created = app.upload(&token, "esr.pdf", "other").await;
        let id = created["id"].as_str().unwrap();

        let (status, export) = app
            .json(empty_request(Method::GET, &format!("/documents/{id}/export"), None))
            .await;
        assert_eq!(status, StatusCode::OK);
        let expected = format!(
            "data:application/pdf;base64,{}",
            general_purpose::STANDARD.encode(pdf_bytes())
        );
        assert_eq!(export["payload"], expected);

        let (status, bytes) = app
            .send(empty_request(Method::GET, &format!("/documents/{id}/content"), None))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, pdf_bytes());
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let app = TestApp::new();
        let (status, _) = app
            .send(empty_request(Method::GET, "/documents/not-an-id", None))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = TestApp::new();
        let (status, doc) = app
            .json(empty_request(Method::GET, "/api-docs/openapi.json", None))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/documents/{id}"].is_object());
        assert!(doc["components"]["securitySchemes"]["bearer"].is_object());
    }

    #[test]
    fn body_limit_covers_base64_expansion() {
        let app = TestApp::new();
        let limits = ValidationLimits::default();
        assert!(app.state.body_limit as u64 > limits.max_bytes * 4 / 3);
    }
}
