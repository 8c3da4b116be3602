//! Error types for the bibliocat library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CatalogError`] — **Fatal**: the batch cannot proceed at all (working
//!   directory cannot be prepared, corrupt archive, bad configuration).
//!   Returned as `Err(CatalogError)` from the staging and top-level entry
//!   points.
//!
//! * [`StageError`] — **Recoverable**: a single pipeline stage failed for one
//!   page or one PDF (render glitch, OCR rejection, malformed model output).
//!   Carried as an explicit value at the catch site so callers and tests can
//!   see *which* path was taken instead of inferring it from an "Unknown"
//!   sentinel. The batch always continues past a `StageError`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the bibliocat library.
///
/// Stage-level failures use [`StageError`] and degrade to empty text,
/// an `Unknown` page count, or an all-"Unknown" record instead of
/// propagating here.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The working directory could not be created, cleared, or read.
    #[error("Failed to prepare working directory '{path}': {source}")]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An uploaded file could not be copied into the working directory.
    #[error("Failed to stage '{path}': {source}")]
    StageFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The uploaded ZIP archive is malformed or an entry could not be read.
    #[error("Archive '{path}' could not be read: {detail}")]
    BadArchive { path: PathBuf, detail: String },

    /// An archive entry path would escape the working directory.
    #[error("Archive entry '{name}' escapes the working directory")]
    UnsafeArchiveEntry { name: String },

    /// Builder validation or credential resolution failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A recoverable error for a single stage of one page or one PDF.
///
/// Every variant is caught at its own scope in the batch driver: a failed
/// page is skipped, a failed page count becomes `Unknown`, and a failed
/// extraction becomes an all-"Unknown" record. None of them abort the batch.
#[derive(Debug, Error)]
pub enum StageError {
    /// The PDF could not be opened or its front pages could not be rendered.
    #[error("page rendering failed: {detail}")]
    RenderFailed { detail: String },

    /// A normalized page image could not be encoded as PNG.
    #[error("page {page} could not be encoded: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The remote text-detection service rejected the request or reported
    /// an error message in its response body.
    #[error("text recognition failed: {detail}")]
    OcrFailed { detail: String },

    /// The page count could not be read from the document.
    #[error("page count unavailable: {detail}")]
    PageCountFailed { detail: String },

    /// The completion call failed: network, non-success status, missing
    /// content, or a reply that is not the expected JSON object.
    #[error("metadata extraction failed: {detail}")]
    ExtractionFailed { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_entry_display() {
        let e = CatalogError::UnsafeArchiveEntry {
            name: "../evil.pdf".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("../evil.pdf"), "got: {msg}");
        assert!(msg.contains("escapes"));
    }

    #[test]
    fn bad_archive_display() {
        let e = CatalogError::BadArchive {
            path: PathBuf::from("books.zip"),
            detail: "invalid central directory".into(),
        };
        assert!(e.to_string().contains("books.zip"));
        assert!(e.to_string().contains("invalid central directory"));
    }

    #[test]
    fn encode_failed_display() {
        let e = StageError::EncodeFailed {
            page: 2,
            detail: "zero-sized image".into(),
        };
        assert!(e.to_string().contains("page 2"));
    }

    #[test]
    fn extraction_failed_display() {
        let e = StageError::ExtractionFailed {
            detail: "HTTP 429".into(),
        };
        assert!(e.to_string().contains("HTTP 429"));
    }
}
