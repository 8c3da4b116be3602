//! # bibliocat
//!
//! Automated bibliographic cataloging of scanned PDF books.
//!
//! Each book travels through a fixed pipeline:
//!
//! ```text
//! staged PDF
//!     │  rasterize first N pages (pdfium)
//!     ▼
//! page images
//!     │  grayscale → autocontrast → 2x upsample
//!     ▼
//! normalized PNGs
//!     │  remote document text detection, one call per page
//!     ▼
//! accumulated OCR text (with per-page markers)
//!     │  one chat-completion call per book
//!     ▼
//! MetadataRecord ─→ BookRow ─→ ResultTable
//! ```
//!
//! Every failure past staging is recoverable: a book that cannot be rendered,
//! read, or understood still yields a row, degraded to `"Unknown"` fields
//! where information is missing. Only input staging itself (a missing working
//! directory, a corrupt archive) aborts a run.
//!
//! ## Quick start
//!
//! ```no_run
//! use bibliocat::{CatalogConfig, Cataloger, OcrCredentials};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CatalogConfig::builder()
//!     .working_dir("pdf")
//!     .ocr_credentials(OcrCredentials::Path("vision.json".into()))
//!     .completion_api_key("gsk-...")
//!     .build()?;
//!
//! let cataloger = Cataloger::new(config)?;
//! let table = cataloger.catalog_file(Path::new("dune.pdf")).await?;
//! println!("{}", serde_json::to_string_pretty(&table)?);
//! # Ok(())
//! # }
//! ```
//!
//! The `server` feature (on by default) adds [`server::router`], an HTTP
//! upload surface with one endpoint per input shape: single PDF, ZIP
//! archive, or multiple PDFs.

pub mod catalog;
pub mod config;
pub mod error;
pub mod intake;
pub mod pipeline;
pub mod prompts;
pub mod record;
#[cfg(feature = "server")]
pub mod server;

pub use catalog::Cataloger;
pub use config::{CatalogConfig, CatalogConfigBuilder, OcrCredentials};
pub use error::{CatalogError, StageError};
pub use intake::Batch;
pub use pipeline::extract::{ChatCompletionModel, ExtractionOutcome, MetadataModel};
pub use pipeline::ocr::{OcrEngine, RemoteOcrEngine};
pub use record::{BookRow, ExtractionStatus, MetadataRecord, PageCount, ResultTable};
