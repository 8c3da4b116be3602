//! OCR client: remote document-text-detection, one call per page image.
//!
//! The service is reached through the [`OcrEngine`] trait so the batch
//! driver can run against a mock in tests and the remote backend can be
//! swapped without touching the pipeline. [`RemoteOcrEngine`] submits the
//! PNG as base64 in an annotate-style JSON request and reads back the full
//! text annotation; a non-empty `error.message` in the response body is a
//! failure even when the HTTP status is 200.

use crate::error::StageError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Per-page marker prepended to each page's recognized text, so the model
/// sees where pages begin.
pub fn page_marker(page: usize) -> String {
    format!("\n--- Page {page} ---\n")
}

/// A document-text-detection backend.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize all text in one PNG-encoded page image.
    async fn recognize(&self, png: &[u8]) -> Result<String, StageError>;
}

/// Remote annotate-endpoint client.
pub struct RemoteOcrEngine {
    endpoint: String,
    bearer_key: String,
    client: reqwest::Client,
}

impl RemoteOcrEngine {
    /// Build the client with a per-call timeout.
    pub fn new(
        endpoint: impl Into<String>,
        bearer_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, crate::error::CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                crate::error::CatalogError::Internal(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            endpoint: endpoint.into(),
            bearer_key: bearer_key.into(),
            client,
        })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateItem>,
}

#[derive(Serialize)]
struct AnnotateItem {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<PageAnnotation>,
}

#[derive(Deserialize, Default)]
struct PageAnnotation {
    #[serde(rename = "fullTextAnnotation")]
    full_text_annotation: Option<FullTextAnnotation>,
    error: Option<RpcStatus>,
}

#[derive(Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct RpcStatus {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl OcrEngine for RemoteOcrEngine {
    async fn recognize(&self, png: &[u8]) -> Result<String, StageError> {
        let request = AnnotateRequest {
            requests: vec![AnnotateItem {
                image: ImageContent {
                    content: STANDARD.encode(png),
                },
                features: vec![Feature {
                    kind: "DOCUMENT_TEXT_DETECTION",
                }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.bearer_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| StageError::OcrFailed {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::OcrFailed {
                detail: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: AnnotateResponse =
            response.json().await.map_err(|e| StageError::OcrFailed {
                detail: format!("malformed response: {e}"),
            })?;

        let annotation = parsed.responses.into_iter().next().unwrap_or_default();

        if let Some(error) = annotation.error {
            if !error.message.is_empty() {
                return Err(StageError::OcrFailed {
                    detail: format!("API error: {}", error.message),
                });
            }
        }

        let text = annotation
            .full_text_annotation
            .map(|a| a.text)
            .unwrap_or_default();
        debug!("OCR returned {} chars", text.len());
        Ok(text)
    }
}
