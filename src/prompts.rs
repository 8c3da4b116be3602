//! Prompts for the metadata-extraction completion call.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tightening an extraction rule or adding a
//!    field requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without a
//!    live completion call, so a field accidentally dropped from the schema
//!    is caught immediately.

/// System instruction defining the six output fields and the extraction
/// rules applied to noisy OCR text.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a highly accurate metadata extraction system for scanned books with noisy OCR. Extract the following fields in clean JSON:

{
  "Book Title": "",
  "Author": "",
  "Editor": "",
  "Year of Publishing": "",
  "Publisher": "",
  "Language": ""
}

Instructions:
- Use the first recognizable title as "Book Title" if the structure suggests a collection or table of contents.
- Infer intelligently if exact values are missing.
- Use "Unknown" only when absolutely no clue is found.
- Output only valid JSON. No extra text or explanation."#;

/// Build the user message embedding the accumulated OCR text of one book.
pub fn user_message(ocr_text: &str) -> String {
    format!("Extract metadata from this book content:\n{ocr_text}")
}
