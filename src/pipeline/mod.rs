//! Pipeline stages for book-metadata extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (e.g. a different OCR backend) without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ normalize ──▶ encode ──▶ ocr ──▶ extract
//! (pdfium)   (gray/2×)     (PNG)     (remote) (completion)
//! ```
//!
//! 1. [`render`]    — rasterize the first pages of a PDF; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 2. [`normalize`] — grayscale, autocontrast, and upsample each page for
//!    OCR fidelity
//! 3. [`encode`]    — PNG-encode each page for the request body
//! 4. [`ocr`]       — remote document-text-detection, one call per page
//! 5. [`extract`]   — one completion call per book turning the accumulated
//!    text into the six-field record

pub mod encode;
pub mod extract;
pub mod normalize;
pub mod ocr;
pub mod render;
