//! Image encoding: normalized `DynamicImage` → PNG byte buffer.
//!
//! PNG is chosen over JPEG because it is lossless — text crispness matters
//! far more than payload size for OCR accuracy, and compression artefacts on
//! rendered glyphs measurably degrade recognition.

use crate::error::StageError;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a normalized page as a PNG byte buffer ready for the OCR request.
///
/// `page` is the 1-based page number, carried into the error for logging.
pub fn encode_png(image: &DynamicImage, page: usize) -> Result<Vec<u8>, StageError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| StageError::EncodeFailed {
            page,
            detail: e.to_string(),
        })?;
    debug!("Encoded page image → {} bytes PNG", buf.len());
    Ok(buf)
}
