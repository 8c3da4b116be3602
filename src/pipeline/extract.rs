//! Metadata extraction: one completion call per book, with a single
//! all-"Unknown" fallback path.
//!
//! The completion service sits behind the [`MetadataModel`] trait so tests
//! can inject deterministic replies. [`ChatCompletionModel`] talks to an
//! OpenAI-compatible `/chat/completions` endpoint with a fixed two-message
//! conversation and a JSON-object response directive.
//!
//! ## Fallback policy
//!
//! Any failure — network, non-success status, missing content, a reply that
//! is not the expected JSON — yields the all-"Unknown" record via
//! [`extract_with_fallback`]. No retries, no distinction between causes in
//! the table itself; the cause is preserved in
//! [`ExtractionStatus::Fallback`] and the logs.

use crate::error::StageError;
use crate::prompts;
use crate::record::{ExtractionStatus, MetadataRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A model that turns accumulated OCR text into a [`MetadataRecord`].
#[async_trait]
pub trait MetadataModel: Send + Sync {
    /// Extract the six fields from `ocr_text`. `display_name` is the staged
    /// file name, used only for logging.
    async fn extract(&self, ocr_text: &str, display_name: &str)
        -> Result<MetadataRecord, StageError>;
}

/// The record plus how it was produced.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub record: MetadataRecord,
    pub status: ExtractionStatus,
}

/// Run the model and substitute the all-"Unknown" record on any failure.
///
/// This is the single catch site for every extraction failure kind; the
/// batch never aborts here.
pub async fn extract_with_fallback(
    model: &dyn MetadataModel,
    ocr_text: &str,
    display_name: &str,
) -> ExtractionOutcome {
    match model.extract(ocr_text, display_name).await {
        Ok(record) => ExtractionOutcome {
            record,
            status: ExtractionStatus::Extracted,
        },
        Err(e) => {
            warn!("Metadata extraction failed for {display_name}: {e}");
            ExtractionOutcome {
                record: MetadataRecord::default(),
                status: ExtractionStatus::Fallback {
                    reason: e.to_string(),
                },
            }
        }
    }
}

/// OpenAI-compatible chat-completion client.
pub struct ChatCompletionModel {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl ChatCompletionModel {
    /// Build the client with a per-call timeout.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: usize,
        timeout_secs: u64,
    ) -> Result<Self, crate::error::CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                crate::error::CatalogError::Internal(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            max_tokens,
            client,
        })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: usize,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Parse the model reply (the message content) into a record.
///
/// The reply must be the six-field JSON object; missing fields default to
/// "Unknown" during deserialization, anything that is not a JSON object
/// fails and takes the fallback path.
pub(crate) fn parse_model_reply(content: &str) -> Result<MetadataRecord, StageError> {
    serde_json::from_str(content).map_err(|e| StageError::ExtractionFailed {
        detail: format!("reply is not the expected JSON: {e}"),
    })
}

#[async_trait]
impl MetadataModel for ChatCompletionModel {
    async fn extract(
        &self,
        ocr_text: &str,
        display_name: &str,
    ) -> Result<MetadataRecord, StageError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: prompts::EXTRACTION_SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user",
                    content: prompts::user_message(ocr_text),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        debug!(
            "Requesting metadata for {display_name} ({} chars of OCR text)",
            ocr_text.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| StageError::ExtractionFailed {
                detail: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StageError::ExtractionFailed {
                detail: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(StageError::ExtractionFailed {
                detail: format!("HTTP {status}: {body}"),
            });
        }

        let chat: ChatResponse =
            serde_json::from_str(&body).map_err(|e| StageError::ExtractionFailed {
                detail: format!("malformed completion response: {e}"),
            })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| StageError::ExtractionFailed {
                detail: "completion response has no content".into(),
            })?;

        parse_model_reply(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UNKNOWN;

    struct FailingModel;

    #[async_trait]
    impl MetadataModel for FailingModel {
        async fn extract(&self, _: &str, _: &str) -> Result<MetadataRecord, StageError> {
            Err(StageError::ExtractionFailed {
                detail: "connection refused".into(),
            })
        }
    }

    #[tokio::test]
    async fn fallback_substitutes_all_unknown() {
        let outcome = extract_with_fallback(&FailingModel, "some text", "book.pdf").await;
        assert_eq!(outcome.record, MetadataRecord::default());
        match outcome.status {
            ExtractionStatus::Fallback { reason } => {
                assert!(reason.contains("connection refused"))
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn valid_reply_parses_into_record() {
        let reply = r#"{
            "Book Title": "Dune",
            "Author": "Frank Herbert",
            "Editor": "Unknown",
            "Year of Publishing": "1965",
            "Publisher": "Chilton Books",
            "Language": "English"
        }"#;
        let record = parse_model_reply(reply).unwrap();
        assert_eq!(record.title, "Dune");
        assert_eq!(record.publisher, "Chilton Books");
        assert_eq!(record.editor, UNKNOWN);
    }

    #[test]
    fn non_json_reply_is_an_extraction_error() {
        let result = parse_model_reply("Sorry, I could not find any metadata.");
        assert!(matches!(result, Err(StageError::ExtractionFailed { .. })));
    }

    #[test]
    fn completion_response_content_is_extracted() {
        let body = r#"{"choices": [{"message": {"content": "{\"Book Title\": \"Dune\"}"}}]}"#;
        let chat: ChatResponse = serde_json::from_str(body).unwrap();
        let content = chat.choices[0].message.content.as_deref().unwrap();
        let record = parse_model_reply(content).unwrap();
        assert_eq!(record.title, "Dune");
    }

    #[test]
    fn request_carries_json_object_directive() {
        let request = ChatRequest {
            model: "llama-3.3-70b-versatile".into(),
            messages: vec![Message {
                role: "system",
                content: "x".into(),
            }],
            temperature: 0.3,
            max_tokens: 1024,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        let temperature = value["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
    }
}
