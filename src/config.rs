//! Configuration for a cataloging run.
//!
//! All behaviour is controlled through [`CatalogConfig`], built via its
//! [`CatalogConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to pass the whole run description around, log it, and diff two
//! runs to understand why their outputs differ.
//!
//! Credentials for the remote text-detection service arrive either as a file
//! path or as inline JSON; the inline form is materialized to a temporary
//! file at startup and the guard kept alive for the life of the
//! [`crate::catalog::Cataloger`].

use crate::error::CatalogError;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Default endpoint of the remote document-text-detection service.
pub const DEFAULT_OCR_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Default base URL of the OpenAI-compatible completion service.
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default completion model identifier.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuration for a cataloging run.
///
/// Built via [`CatalogConfig::builder()`] or [`CatalogConfig::default()`].
///
/// # Example
/// ```rust
/// use bibliocat::CatalogConfig;
///
/// let config = CatalogConfig::builder()
///     .working_dir("pdf")
///     .pages_per_book(3)
///     .model("llama-3.3-70b-versatile")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CatalogConfig {
    /// Directory that holds the staged PDFs of the current run. Cleared at
    /// the start of every run. Default: `./pdf`.
    pub working_dir: PathBuf,

    /// How many front pages to rasterize per book. Range 1–10, default 3.
    ///
    /// Bibliographic front matter (title page, imprint page) almost always
    /// sits in the first three pages; going deeper mostly adds OCR cost and
    /// table-of-contents noise.
    pub pages_per_book: usize,

    /// Maximum rendered page dimension (width or height) in pixels before
    /// normalization. Default: 2000.
    ///
    /// A safety cap: an A0-sized scan rendered at full density could exhaust
    /// memory once the normalizer doubles it again. Either dimension is
    /// capped, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// Upsampling factor applied by the normalizer after grayscale and
    /// autocontrast. Range 1–4, default 2.
    pub ocr_scale: u32,

    /// Endpoint of the remote document-text-detection service.
    pub ocr_endpoint: String,

    /// Credential for the text-detection service: a file path or inline JSON.
    pub ocr_credentials: Option<OcrCredentials>,

    /// Base URL of the OpenAI-compatible completion service.
    pub completion_base_url: String,

    /// Bearer key for the completion service.
    pub completion_api_key: Option<String>,

    /// Completion model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Sampling temperature for the completion. Default: 0.3.
    ///
    /// Low enough to keep field extraction stable while still letting the
    /// model infer plausible values from noisy OCR instead of refusing.
    pub temperature: f32,

    /// Maximum tokens the model may generate per record. Default: 1024.
    pub max_tokens: usize,

    /// Per-remote-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("pdf"),
            pages_per_book: 3,
            max_rendered_pixels: 2000,
            ocr_scale: 2,
            ocr_endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            ocr_credentials: None,
            completion_base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
            completion_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 1024,
            api_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("working_dir", &self.working_dir)
            .field("pages_per_book", &self.pages_per_book)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_scale", &self.ocr_scale)
            .field("ocr_endpoint", &self.ocr_endpoint)
            .field("ocr_credentials", &self.ocr_credentials.as_ref().map(|_| "<redacted>"))
            .field("completion_base_url", &self.completion_base_url)
            .field("completion_api_key", &self.completion_api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl CatalogConfig {
    /// Create a new builder for `CatalogConfig`.
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CatalogConfig`].
#[derive(Debug)]
pub struct CatalogConfigBuilder {
    config: CatalogConfig,
}

impl CatalogConfigBuilder {
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.working_dir = dir.into();
        self
    }

    pub fn pages_per_book(mut self, n: usize) -> Self {
        self.config.pages_per_book = n.clamp(1, 10);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_scale(mut self, scale: u32) -> Self {
        self.config.ocr_scale = scale.clamp(1, 4);
        self
    }

    pub fn ocr_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.ocr_endpoint = endpoint.into();
        self
    }

    pub fn ocr_credentials(mut self, credentials: OcrCredentials) -> Self {
        self.config.ocr_credentials = Some(credentials);
        self
    }

    pub fn completion_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.completion_base_url = url.into();
        self
    }

    pub fn completion_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.completion_api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CatalogConfig, CatalogError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(CatalogError::InvalidConfig("Model must not be empty".into()));
        }
        if c.working_dir.as_os_str().is_empty() {
            return Err(CatalogError::InvalidConfig(
                "Working directory must not be empty".into(),
            ));
        }
        if !(1..=10).contains(&c.pages_per_book) {
            return Err(CatalogError::InvalidConfig(format!(
                "pages_per_book must be 1–10, got {}",
                c.pages_per_book
            )));
        }
        Ok(self.config)
    }
}

// ── Credentials ──────────────────────────────────────────────────────────

/// Credential for the remote text-detection service.
///
/// Mirrors the two ways the environment can supply it: a path to an existing
/// credential file, or the file's JSON content inline (materialized to a
/// temporary file at startup).
#[derive(Clone)]
pub enum OcrCredentials {
    /// Path to a credential file on disk.
    Path(PathBuf),
    /// Inline credential JSON; written to a temp file by [`OcrCredentials::resolve`].
    Inline(String),
}

impl fmt::Debug for OcrCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrCredentials::Path(p) => f.debug_tuple("Path").field(p).finish(),
            OcrCredentials::Inline(_) => f.write_str("Inline(<redacted>)"),
        }
    }
}

/// A credential file ready to read. Keeps the temp file alive when the
/// credential arrived inline.
pub struct ResolvedCredentials {
    path: PathBuf,
    _guard: Option<NamedTempFile>,
}

impl OcrCredentials {
    /// Resolve the credential to a file path, materializing inline JSON.
    pub fn resolve(&self) -> Result<ResolvedCredentials, CatalogError> {
        match self {
            OcrCredentials::Path(path) => Ok(ResolvedCredentials {
                path: path.clone(),
                _guard: None,
            }),
            OcrCredentials::Inline(json) => {
                let mut file = NamedTempFile::with_suffix(".json").map_err(|e| {
                    CatalogError::InvalidConfig(format!("Failed to create credential file: {e}"))
                })?;
                file.write_all(json.as_bytes()).map_err(|e| {
                    CatalogError::InvalidConfig(format!("Failed to write credential file: {e}"))
                })?;
                Ok(ResolvedCredentials {
                    path: file.path().to_path_buf(),
                    _guard: Some(file),
                })
            }
        }
    }
}

impl ResolvedCredentials {
    /// Path to the credential file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Take ownership of the temp-file guard, if the credential was inline.
    pub fn into_guard(self) -> Option<NamedTempFile> {
        self._guard
    }

    /// Read the bearer key from the credential file.
    ///
    /// The file is expected to be JSON with an `api_key` field; a file that
    /// is not JSON is treated as the raw key itself.
    pub fn bearer_key(&self) -> Result<String, CatalogError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            CatalogError::InvalidConfig(format!(
                "Failed to read credential file '{}': {e}",
                self.path.display()
            ))
        })?;

        let key = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => value
                .get("api_key")
                .and_then(|k| k.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    CatalogError::InvalidConfig(
                        "Credential JSON is missing the 'api_key' field".into(),
                    )
                })?,
            Err(_) => raw.trim().to_string(),
        };

        if key.is_empty() {
            return Err(CatalogError::InvalidConfig("Credential key is empty".into()));
        }
        Ok(key)
    }
}
