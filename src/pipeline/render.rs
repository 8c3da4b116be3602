//! PDF rasterization: render the front pages to `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking thread
//! pool, keeping the async workers free during CPU-heavy rendering.
//!
//! ## Failure scope
//!
//! Everything here is recoverable at the caller: a document that cannot be
//! opened or rendered yields `Err(StageError)`, which the batch driver maps
//! to zero page images (the book still flows through extraction with empty
//! text) or to an `Unknown` page count. A missing pdfium library therefore
//! degrades the output instead of crashing the process.

use crate::error::StageError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// Rasterize the first `limit` pages of a PDF into images.
///
/// Runs inside `spawn_blocking` since pdfium operations are CPU-bound.
/// Pages that fail individually are skipped with a warning; only a document
/// that cannot be opened at all is an error.
pub async fn render_front_pages(
    pdf_path: &Path,
    limit: usize,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, StageError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || render_blocking(&path, limit, max_pixels))
        .await
        .map_err(|e| StageError::RenderFailed {
            detail: format!("render task panicked: {e}"),
        })?
}

fn render_blocking(
    pdf_path: &Path,
    limit: usize,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, StageError> {
    let pdfium = bind_pdfium().map_err(|detail| StageError::RenderFailed { detail })?;

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| StageError::RenderFailed {
                detail: format!("{e:?}"),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    debug!("PDF opened for rendering: {total_pages} pages");

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(limit.min(total_pages));

    for idx in 0..limit.min(total_pages) {
        let page = match pages.get(idx as u16) {
            Ok(page) => page,
            Err(e) => {
                warn!("Skipping page {}: {e:?}", idx + 1);
                continue;
            }
        };

        match page.render_with_config(&render_config) {
            Ok(bitmap) => {
                let image = bitmap.as_image();
                debug!("Rendered page {} → {}x{} px", idx + 1, image.width(), image.height());
                images.push(image);
            }
            Err(e) => warn!("Rendering failed for page {}: {e:?}", idx + 1),
        };
    }

    Ok(images)
}

/// Count the total pages of a PDF.
///
/// Opens the document independently of rendering so a render failure and a
/// count failure stay fully independent.
pub async fn count_pages(pdf_path: &Path) -> Result<usize, StageError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || count_blocking(&path))
        .await
        .map_err(|e| StageError::PageCountFailed {
            detail: format!("count task panicked: {e}"),
        })?
}

fn count_blocking(pdf_path: &Path) -> Result<usize, StageError> {
    let pdfium = bind_pdfium().map_err(|detail| StageError::PageCountFailed { detail })?;

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| StageError::PageCountFailed {
                detail: format!("{e:?}"),
            })?;

    Ok(document.pages().len() as usize)
}

/// Bind to a pdfium library next to the executable or on the system.
fn bind_pdfium() -> Result<Pdfium, String> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| format!("pdfium binding failed: {e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Rendering a real PDF needs a pdfium library on the host; these tests
    // only pin down the recoverable-failure contract for broken inputs.

    #[tokio::test]
    async fn unreadable_file_is_a_stage_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("not-a.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let result = render_front_pages(&path, 3, 2000).await;
        assert!(matches!(result, Err(StageError::RenderFailed { .. })));
    }

    #[tokio::test]
    async fn count_failure_is_independent_of_rendering() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing.pdf");

        let result = count_pages(&path).await;
        assert!(matches!(result, Err(StageError::PageCountFailed { .. })));
    }
}
