//! Output types: the six-field metadata record and the assembled result table.
//!
//! The serialized shape is a hard contract: every row carries exactly the
//! eight fixed columns (`Book Title`, `Author`, `Editor`,
//! `Year of Publishing`, `Publisher`, `Language`, `Number of Pages`,
//! `Format`), and a failed extraction fills fields with the literal
//! `"Unknown"` rather than omitting them. Extraction provenance
//! ([`ExtractionStatus`]) is kept on the row for callers and tests but is
//! deliberately *not* a column, so the table contract stays fixed.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Placeholder used whenever a field cannot be determined.
pub const UNKNOWN: &str = "Unknown";

/// Constant value of the `Format` column.
pub const BOOK_FORMAT: &str = "PDF";

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Accept any JSON scalar for a metadata field and keep its text form.
///
/// Models occasionally return `"Year of Publishing": 1995` instead of a
/// string. The fields are free text by contract, so a bare number or bool is
/// kept verbatim and `null` degrades to `"Unknown"` instead of failing the
/// whole record.
fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Null => Ok(unknown()),
        other => Err(de::Error::custom(format!(
            "expected a scalar metadata field, got {other}"
        ))),
    }
}

/// The six bibliographic fields extracted from a book's front matter.
///
/// All fields are free text. `Default` yields the all-"Unknown" record used
/// as the single fallback for every extraction failure. Deserialization fills
/// any missing field with `"Unknown"`, so a partial model reply still
/// produces a complete record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "Book Title", default = "unknown", deserialize_with = "loose_string")]
    pub title: String,

    #[serde(rename = "Author", default = "unknown", deserialize_with = "loose_string")]
    pub author: String,

    #[serde(rename = "Editor", default = "unknown", deserialize_with = "loose_string")]
    pub editor: String,

    #[serde(rename = "Year of Publishing", default = "unknown", deserialize_with = "loose_string")]
    pub year: String,

    #[serde(rename = "Publisher", default = "unknown", deserialize_with = "loose_string")]
    pub publisher: String,

    #[serde(rename = "Language", default = "unknown", deserialize_with = "loose_string")]
    pub language: String,
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self {
            title: unknown(),
            author: unknown(),
            editor: unknown(),
            year: unknown(),
            publisher: unknown(),
            language: unknown(),
        }
    }
}

/// Total page count of a PDF, or `Unknown` when the document could not be
/// opened for counting.
///
/// Serializes as a JSON integer or the literal string `"Unknown"`, matching
/// the `Number of Pages` column contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCount {
    Known(usize),
    Unknown,
}

impl Serialize for PageCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageCount::Known(n) => serializer.serialize_u64(*n as u64),
            PageCount::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

impl fmt::Display for PageCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageCount::Known(n) => write!(f, "{n}"),
            PageCount::Unknown => f.write_str(UNKNOWN),
        }
    }
}

/// How a row's metadata record was produced.
///
/// `Fallback` means the extractor substituted the all-"Unknown" record after
/// a failure; the reason is the stage error's message. This is what lets a
/// caller tell "the model said Unknown" apart from "the call never succeeded"
/// without changing the table columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    /// The model reply parsed successfully.
    Extracted,
    /// The record was substituted after a failure.
    Fallback { reason: String },
}

impl ExtractionStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ExtractionStatus::Fallback { .. })
    }
}

/// One finished row of the result table: metadata plus the two derived
/// columns.
#[derive(Debug, Clone, Serialize)]
pub struct BookRow {
    /// Staged file name the row was produced from. Not a table column.
    #[serde(skip)]
    pub file_name: String,

    #[serde(flatten)]
    pub metadata: MetadataRecord,

    #[serde(rename = "Number of Pages")]
    pub pages: PageCount,

    /// Always [`BOOK_FORMAT`].
    #[serde(rename = "Format")]
    pub format: &'static str,

    /// Extraction provenance. Not a table column.
    #[serde(skip)]
    pub status: ExtractionStatus,
}

/// The assembled batch result: one [`BookRow`] per staged PDF, in directory
/// enumeration order. Rebuilt from scratch on every run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    pub rows: Vec<BookRow>,
}

impl ResultTable {
    /// Column names, in output order.
    pub const COLUMNS: [&'static str; 8] = [
        "Book Title",
        "Author",
        "Editor",
        "Year of Publishing",
        "Publisher",
        "Language",
        "Number of Pages",
        "Format",
    ];

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BookRow> {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(pages: PageCount) -> BookRow {
        BookRow {
            file_name: "sample.pdf".into(),
            metadata: MetadataRecord::default(),
            pages,
            format: BOOK_FORMAT,
            status: ExtractionStatus::Extracted,
        }
    }

    #[test]
    fn default_record_is_all_unknown() {
        let r = MetadataRecord::default();
        for field in [&r.title, &r.author, &r.editor, &r.year, &r.publisher, &r.language] {
            assert_eq!(field, UNKNOWN);
        }
    }

    #[test]
    fn row_serializes_all_eight_columns() {
        let value = serde_json::to_value(sample_row(PageCount::Known(12))).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), ResultTable::COLUMNS.len());
        for col in ResultTable::COLUMNS {
            assert!(obj.contains_key(col), "missing column {col}");
            assert!(!obj[col].is_null(), "null cell in column {col}");
        }
        assert_eq!(obj["Number of Pages"], serde_json::json!(12));
        assert_eq!(obj["Format"], serde_json::json!("PDF"));
    }

    #[test]
    fn unknown_page_count_serializes_as_literal() {
        let value = serde_json::to_value(sample_row(PageCount::Unknown)).unwrap();
        assert_eq!(value["Number of Pages"], serde_json::json!("Unknown"));
    }

    #[test]
    fn partial_model_reply_fills_missing_fields() {
        let record: MetadataRecord =
            serde_json::from_str(r#"{"Book Title": "Dune", "Author": "Frank Herbert"}"#).unwrap();
        assert_eq!(record.title, "Dune");
        assert_eq!(record.author, "Frank Herbert");
        assert_eq!(record.editor, UNKNOWN);
        assert_eq!(record.publisher, UNKNOWN);
    }

    #[test]
    fn numeric_year_is_kept_as_text() {
        let record: MetadataRecord =
            serde_json::from_str(r#"{"Year of Publishing": 1965}"#).unwrap();
        assert_eq!(record.year, "1965");
    }

    #[test]
    fn null_field_degrades_to_unknown() {
        let record: MetadataRecord = serde_json::from_str(r#"{"Language": null}"#).unwrap();
        assert_eq!(record.language, UNKNOWN);
    }

    #[test]
    fn table_serializes_as_array() {
        let table = ResultTable {
            rows: vec![sample_row(PageCount::Known(1)), sample_row(PageCount::Unknown)],
        };
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}
