//! HTTP upload surface: a minimal form plus the three catalog endpoints.
//!
//! The three entry points mirror the three input shapes and are functionally
//! independent: each clears prior staging, runs the full pipeline, and
//! returns the complete table as JSON. Uploads are spooled to a per-request
//! temp directory before staging so the working directory only ever sees
//! whole files.
//!
//! Runs are serialized with a tokio mutex: the working directory is owned by
//! exactly one run at a time, so two concurrent uploads cannot race on its
//! contents.

use crate::catalog::Cataloger;
use crate::error::CatalogError;
use crate::record::ResultTable;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Largest accepted upload body. Scanned books are big; 200 MB covers a
/// sizeable ZIP without letting a single request exhaust memory.
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Book Metadata Cataloging</title></head>
<body>
  <h1>Automated Book Metadata Cataloging</h1>

  <h2>Upload Single PDF</h2>
  <form action="/catalog/single" method="post" enctype="multipart/form-data">
    <input type="file" name="file" accept=".pdf" required>
    <button type="submit">Process PDF</button>
  </form>

  <h2>Upload ZIP of PDFs</h2>
  <form action="/catalog/archive" method="post" enctype="multipart/form-data">
    <input type="file" name="archive" accept=".zip" required>
    <button type="submit">Process ZIP</button>
  </form>

  <h2>Upload Multiple PDFs</h2>
  <form action="/catalog/files" method="post" enctype="multipart/form-data">
    <input type="file" name="files" accept=".pdf" multiple required>
    <button type="submit">Process PDFs</button>
  </form>
</body>
</html>
"#;

#[derive(Clone)]
struct AppState {
    cataloger: Arc<Cataloger>,
    run_lock: Arc<Mutex<()>>,
}

/// Build the application router.
pub fn router(cataloger: Arc<Cataloger>) -> Router {
    let state = AppState {
        cataloger,
        run_lock: Arc::new(Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/catalog/single", post(catalog_single))
        .route("/catalog/archive", post(catalog_archive))
        .route("/catalog/files", post(catalog_files))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn catalog_single(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ResultTable>, ApiError> {
    let (spool, files) = spool_uploads(multipart).await?;
    let file = files
        .first()
        .ok_or_else(|| ApiError::BadRequest("no PDF uploaded".into()))?;

    let _run = state.run_lock.lock().await;
    let table = state.cataloger.catalog_file(file).await?;
    drop(spool);
    Ok(Json(table))
}

async fn catalog_archive(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ResultTable>, ApiError> {
    let (spool, files) = spool_uploads(multipart).await?;
    let archive = files
        .first()
        .ok_or_else(|| ApiError::BadRequest("no archive uploaded".into()))?;

    let _run = state.run_lock.lock().await;
    let table = state.cataloger.catalog_archive(archive).await?;
    drop(spool);
    Ok(Json(table))
}

async fn catalog_files(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ResultTable>, ApiError> {
    let (spool, files) = spool_uploads(multipart).await?;
    if files.is_empty() {
        return Err(ApiError::BadRequest("no PDFs uploaded".into()));
    }

    let _run = state.run_lock.lock().await;
    let table = state.cataloger.catalog_files(&files).await?;
    drop(spool);
    Ok(Json(table))
}

/// Write every file part of the request into a temp directory.
///
/// Returns the directory guard alongside the paths; dropping the guard
/// removes the spooled files.
async fn spool_uploads(mut multipart: Multipart) -> Result<(TempDir, Vec<PathBuf>), ApiError> {
    let spool = TempDir::new()
        .map_err(|e| ApiError::Internal(format!("failed to create upload dir: {e}")))?;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        // Base name only: the client controls the file name.
        let base = PathBuf::from(&file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;

        let path = spool.path().join(&base);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to spool upload: {e}")))?;

        info!("Spooled upload {base} ({} bytes)", bytes.len());
        files.push(path);
    }

    Ok((spool, files))
}

// ── Error mapping ────────────────────────────────────────────────────────

enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::error::StageError;
    use crate::pipeline::extract::MetadataModel;
    use crate::pipeline::ocr::OcrEngine;
    use crate::record::MetadataRecord;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    struct StubOcr;

    #[async_trait]
    impl OcrEngine for StubOcr {
        async fn recognize(&self, _png: &[u8]) -> Result<String, StageError> {
            Ok("stub text".into())
        }
    }

    struct StubModel;

    #[async_trait]
    impl MetadataModel for StubModel {
        async fn extract(&self, _: &str, _: &str) -> Result<MetadataRecord, StageError> {
            Ok(MetadataRecord {
                title: "Stub Book".into(),
                ..MetadataRecord::default()
            })
        }
    }

    fn test_router(workdir: &std::path::Path) -> Router {
        let config = CatalogConfig::builder()
            .working_dir(workdir)
            .build()
            .unwrap();
        let cataloger = Cataloger::with_engines(config, Arc::new(StubOcr), Arc::new(StubModel));
        router(Arc::new(cataloger))
    }

    #[tokio::test]
    async fn index_serves_the_three_forms() {
        let workdir = tempfile::TempDir::new().unwrap();
        let app = test_router(workdir.path());

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        for action in ["/catalog/single", "/catalog/archive", "/catalog/files"] {
            assert!(html.contains(action), "form missing action {action}");
        }
    }

    fn multipart_body(boundary: &str, parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, content) in parts {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; \
                     name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    #[tokio::test]
    async fn multi_file_upload_returns_one_row_per_pdf() {
        let workdir = tempfile::TempDir::new().unwrap();
        let app = test_router(workdir.path());

        let boundary = "test-boundary";
        let body = multipart_body(
            boundary,
            &[
                ("files", "a.pdf", b"%PDF fake a"),
                ("files", "b.pdf", b"%PDF fake b"),
            ],
        );

        let response = app
            .oneshot(
                Request::post("/catalog/files")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let rows: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 2);
        assert_eq!(rows[0]["Book Title"], "Stub Book");
        assert_eq!(rows[0]["Format"], "PDF");
    }

    #[tokio::test]
    async fn empty_upload_is_a_bad_request() {
        let workdir = tempfile::TempDir::new().unwrap();
        let app = test_router(workdir.path());

        let boundary = "empty-boundary";
        let body = multipart_body(boundary, &[]);

        let response = app
            .oneshot(
                Request::post("/catalog/single")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
