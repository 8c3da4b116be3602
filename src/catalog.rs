//! The batch driver: stage input, walk each PDF through the pipeline, and
//! assemble the result table.
//!
//! ## Why a `Cataloger`?
//!
//! The remote engines are constructed exactly once from the configuration and
//! passed explicitly through the run — no module-level singleton client. That
//! makes the dependency visible at every call site and lets tests swap in
//! deterministic engines via [`Cataloger::with_engines`].
//!
//! ## Sequencing
//!
//! The whole batch is strictly sequential: PDFs one at a time, pages within a
//! PDF one at a time, every remote call awaited before the next begins. The
//! result table is returned only once the entire batch has finished; there is
//! no partial or streaming view.

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::intake::{self, Batch};
use crate::pipeline::extract::{extract_with_fallback, ChatCompletionModel, MetadataModel};
use crate::pipeline::ocr::{page_marker, OcrEngine, RemoteOcrEngine};
use crate::pipeline::{encode, normalize, render};
use crate::record::{BookRow, PageCount, ResultTable, BOOK_FORMAT};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// The configured pipeline: one OCR engine, one completion model, one
/// working directory.
pub struct Cataloger {
    config: CatalogConfig,
    ocr: Arc<dyn OcrEngine>,
    model: Arc<dyn MetadataModel>,
    // Keeps an inline-JSON credential file alive for the process lifetime.
    _credential_guard: Option<NamedTempFile>,
}

impl Cataloger {
    /// Build the remote engines from the configuration.
    ///
    /// Fails fast when a credential or API key is missing, rather than
    /// surfacing the problem as per-book fallbacks later.
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let credentials = config.ocr_credentials.as_ref().ok_or_else(|| {
            CatalogError::InvalidConfig("OCR credentials are not configured".into())
        })?;
        let resolved = credentials.resolve()?;
        let ocr_key = resolved.bearer_key()?;

        let completion_key = config.completion_api_key.clone().ok_or_else(|| {
            CatalogError::InvalidConfig("Completion API key is not configured".into())
        })?;

        let ocr = RemoteOcrEngine::new(
            config.ocr_endpoint.clone(),
            ocr_key,
            config.api_timeout_secs,
        )?;
        let model = ChatCompletionModel::new(
            config.completion_base_url.clone(),
            completion_key,
            config.model.clone(),
            config.temperature,
            config.max_tokens,
            config.api_timeout_secs,
        )?;

        Ok(Self {
            config,
            ocr: Arc::new(ocr),
            model: Arc::new(model),
            _credential_guard: resolved.into_guard(),
        })
    }

    /// Build a cataloger around externally constructed engines.
    ///
    /// This is the seam tests use to run the full pipeline with
    /// deterministic mock backends.
    pub fn with_engines(
        config: CatalogConfig,
        ocr: Arc<dyn OcrEngine>,
        model: Arc<dyn MetadataModel>,
    ) -> Self {
        Self {
            config,
            ocr,
            model,
            _credential_guard: None,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Catalog a single uploaded PDF.
    pub async fn catalog_file(&self, src: &Path) -> Result<ResultTable, CatalogError> {
        let batch = intake::stage_file(&self.config.working_dir, src)?;
        Ok(self.catalog_batch(&batch).await)
    }

    /// Catalog a ZIP archive of PDFs.
    pub async fn catalog_archive(&self, archive: &Path) -> Result<ResultTable, CatalogError> {
        let batch = intake::stage_archive(&self.config.working_dir, archive)?;
        Ok(self.catalog_batch(&batch).await)
    }

    /// Catalog a multi-file selection.
    pub async fn catalog_files(&self, srcs: &[PathBuf]) -> Result<ResultTable, CatalogError> {
        let batch = intake::stage_files(&self.config.working_dir, srcs)?;
        Ok(self.catalog_batch(&batch).await)
    }

    /// Run the pipeline over an already staged batch.
    ///
    /// Always produces exactly one row per staged PDF: every failure past
    /// staging is recoverable and degrades to empty text, an `Unknown` page
    /// count, or the all-"Unknown" record.
    pub async fn catalog_batch(&self, batch: &Batch) -> ResultTable {
        let start = Instant::now();
        info!("Cataloging batch of {} PDFs", batch.len());

        let mut rows = Vec::with_capacity(batch.len());
        for path in batch.files() {
            rows.push(self.catalog_one(path).await);
        }

        info!(
            "Batch complete: {} rows in {}ms",
            rows.len(),
            start.elapsed().as_millis()
        );
        ResultTable { rows }
    }

    async fn catalog_one(&self, path: &Path) -> BookRow {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!("Processing: {name}");

        // ── Rasterize front pages ────────────────────────────────────────
        let images = match render::render_front_pages(
            path,
            self.config.pages_per_book,
            self.config.max_rendered_pixels,
        )
        .await
        {
            Ok(images) => images,
            Err(e) => {
                warn!("Error converting {name}: {e}");
                Vec::new()
            }
        };

        // ── Per page: normalize → encode → OCR ───────────────────────────
        let mut text = String::new();
        for (i, image) in images.iter().enumerate() {
            let page = i + 1;
            let normalized = normalize::normalize_for_ocr(image, self.config.ocr_scale);

            let png = match encode::encode_png(&normalized, page) {
                Ok(png) => png,
                Err(e) => {
                    warn!("{name}: {e}");
                    continue;
                }
            };

            match self.ocr.recognize(&png).await {
                Ok(page_text) => {
                    text.push_str(&page_marker(page));
                    text.push_str(&page_text);
                }
                Err(e) => warn!("OCR failed on page {page} of {name}: {e}"),
            }
        }
        debug!("Accumulated {} chars of OCR text for {name}", text.len());

        // ── Extract metadata (single fallback path) ──────────────────────
        let outcome = extract_with_fallback(self.model.as_ref(), &text, &name).await;

        // ── Page count, independent of rendering ─────────────────────────
        let pages = match render::count_pages(path).await {
            Ok(n) => PageCount::Known(n),
            Err(e) => {
                warn!("Page count failed for {name}: {e}");
                PageCount::Unknown
            }
        };

        BookRow {
            file_name: name,
            metadata: outcome.record,
            pages,
            format: BOOK_FORMAT,
            status: outcome.status,
        }
    }
}
