//! Normalized import records staged for the search index.

use crate::extractor::{RENT_UNKNOWN, types::rent_from_value};
use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::{Map, Value};

/// Date recorded when a lease date is missing.
pub const DATE_UNKNOWN: &str = "1900-01-01";
/// Placeholder the model uses for fields absent from a document.
pub const NOT_AVAILABLE: &str = "Not Available";
/// Host serving authenticated browser links to Cloud Storage objects.
pub const BROWSER_HOST: &str = "https://storage.cloud.google.com";

/// Stable identifier for the document stored at `file_path`: the MD5 hex digest of the path.
pub fn document_id(file_path: &str) -> String {
    hex::encode(Md5::digest(file_path.as_bytes()))
}

/// One line of the staged JSONL import file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// Identifier derived from the source path.
    pub id: String,
    /// Reference to the indexed document itself.
    pub content: ContentRef,
    /// Searchable metadata.
    pub struct_data: StructData,
}

/// Content reference of an import record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    /// MIME type of the referenced document.
    pub mime_type: String,
    /// `gs://` URI of the referenced document.
    pub uri: String,
}

/// Structured metadata attached to an import record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructData {
    /// File name shown in search results.
    pub title: String,
    /// City of the property.
    pub city: String,
    /// Street address of the property.
    pub street: String,
    /// Province or state of the property.
    pub province: String,
    /// Postal or ZIP code.
    pub postalcode: String,
    /// Lease start date, [`DATE_UNKNOWN`] when missing.
    pub lease_start_date: String,
    /// Lease end date, [`DATE_UNKNOWN`] when missing.
    pub lease_end_date: String,
    /// Monthly rent, [`RENT_UNKNOWN`] when missing.
    pub rent: i64,
    /// Language of the document.
    pub document_language: String,
    /// Browser link to the document.
    pub url: String,
}

impl ImportRecord {
    /// Build the import record for a forwarded lease metadata object.
    pub fn from_metadata(data: &Map<String, Value>) -> Self {
        let file_path = text_field(data, "file_path");
        let (_, object) = split_gcs_uri(&file_path);

        Self {
            id: document_id(&file_path),
            content: ContentRef {
                mime_type: crate::extractor::schema::PDF_MIME_TYPE.to_string(),
                uri: file_path.clone(),
            },
            struct_data: StructData {
                title: file_name(object).to_string(),
                city: text_field(data, "city"),
                street: text_field(data, "street"),
                province: text_field(data, "province"),
                postalcode: text_field(data, "postalcode"),
                lease_start_date: normalize_date(&text_field(data, "lease_start_date")),
                lease_end_date: normalize_date(&text_field(data, "lease_end_date")),
                rent: normalize_rent(data.get("rent")),
                document_language: text_field(data, "document_language"),
                url: browser_url(&file_path),
            },
        }
    }

    /// Serialize as a single JSONL line, newline included.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

fn text_field(data: &Map<String, Value>, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Use dashes as separators and substitute [`DATE_UNKNOWN`] for placeholders.
pub fn normalize_date(raw: &str) -> String {
    let date = raw.replace('/', "-");
    let trimmed = date.trim();
    if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
        DATE_UNKNOWN.to_string()
    } else {
        date
    }
}

/// Integer rent, or [`RENT_UNKNOWN`] when missing or not numeric.
pub fn normalize_rent(raw: Option<&Value>) -> i64 {
    raw.map_or(RENT_UNKNOWN, rent_from_value)
}

/// Split `gs://bucket/object` into its bucket and object path.
///
/// Anything without a scheme is treated as an object path with an empty bucket.
pub fn split_gcs_uri(uri: &str) -> (&str, &str) {
    let Some((_, rest)) = uri.split_once("://") else {
        return ("", uri.trim_start_matches('/'));
    };
    match rest.split_once('/') {
        Some((bucket, object)) => (bucket, object.trim_start_matches('/')),
        None => (rest, ""),
    }
}

/// Last segment of an object path.
pub fn file_name(object: &str) -> &str {
    object.rsplit('/').next().unwrap_or_default()
}

/// Browser link for a `gs://` URI, keeping the same bucket and object path.
pub fn browser_url(file_path: &str) -> String {
    let (bucket, object) = split_gcs_uri(file_path);
    format!("{BROWSER_HOST}/{bucket}/{object}")
}
