//! Records and outcomes of the metadata extractor.

use crate::gcp::GcpError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Rent recorded when the amount is missing or not a number.
pub const RENT_UNKNOWN: i64 = -1;

/// Fields extracted from a lease document by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseMetadata {
    /// City where the property is located.
    #[serde(default)]
    pub city: String,
    /// Street address of the property.
    #[serde(default)]
    pub street: String,
    /// Province or state of the property.
    #[serde(default)]
    pub province: String,
    /// Postal or ZIP code.
    #[serde(default)]
    pub postalcode: String,
    /// Lease start date, `YYYY-MM-DD`.
    #[serde(default)]
    pub lease_start_date: String,
    /// Lease end date, `YYYY-MM-DD`.
    #[serde(default)]
    pub lease_end_date: String,
    /// Monthly rent amount; [`RENT_UNKNOWN`] when absent.
    #[serde(default = "unknown_rent", deserialize_with = "deserialize_rent")]
    pub rent: i64,
    /// Language of the lease document.
    #[serde(default)]
    pub document_language: String,
}

/// Metadata record as persisted and forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Extracted fields.
    #[serde(flatten)]
    pub metadata: LeaseMetadata,
    /// Canonical `gs://` URI of the source PDF.
    pub file_path: String,
    /// First time the record was written, `YYYY-MM-DD HH:MM:SS` Eastern time.
    pub create_datetime: String,
    /// Last time the record was written, `YYYY-MM-DD HH:MM:SS` Eastern time.
    pub update_datetime: String,
}

fn unknown_rent() -> i64 {
    RENT_UNKNOWN
}

/// Accept integers, floats (truncated), and numeric strings; anything else is unknown.
pub fn rent_from_value(value: &Value) -> i64 {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| finite_truncated(number.as_f64()))
            .unwrap_or(RENT_UNKNOWN),
        Value::String(text) => {
            let cleaned: String = text
                .trim()
                .chars()
                .filter(|ch| !matches!(ch, '$' | ',' | ' '))
                .collect();
            cleaned
                .parse::<i64>()
                .ok()
                .or_else(|| finite_truncated(cleaned.parse::<f64>().ok()))
                .unwrap_or(RENT_UNKNOWN)
        }
        _ => RENT_UNKNOWN,
    }
}

/// `NaN` and infinities parse as floats but are not amounts.
fn finite_truncated(float: Option<f64>) -> Option<i64> {
    float
        .filter(|float| float.is_finite())
        .map(|float| float.trunc() as i64)
}

fn deserialize_rent<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(rent_from_value(&value))
}

/// Why a message was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Data missing or not decodable as UTF-8 base64.
    MalformedPayload,
    /// Payload decoded but was not JSON.
    NonJson,
    /// Bucket or object name absent.
    MissingObject,
    /// Object outside the target prefix.
    OutsidePrefix,
    /// Object is not a PDF.
    NotPdf,
}

/// Result of one extractor invocation. The handler never returns anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Metadata was stored and forwarded.
    Processed {
        /// Firestore document holding the record.
        document_id: String,
        /// Identifier of the forwarded message.
        message_id: String,
    },
    /// A record already exists and overwriting is disabled.
    SkippedExisting {
        /// Identifier of the existing document.
        document_id: String,
    },
    /// The message did not describe a document to process.
    Ignored(IgnoreReason),
    /// The model's answer was not valid JSON for the lease schema.
    DecodeError(String),
    /// The metadata collection was cleared.
    Cleared {
        /// Number of documents removed.
        deleted: usize,
    },
    /// A downstream call failed.
    Failed(String),
}

impl ExtractionOutcome {
    /// Short machine-readable label.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Processed { .. } => "processed",
            Self::SkippedExisting { .. } => "skipped",
            Self::Ignored(_) => "ignored",
            Self::DecodeError(_) => "decode_error",
            Self::Cleared { .. } => "cleared",
            Self::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for ExtractionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processed { .. } => f.write_str("PDF processed successfully."),
            Self::SkippedExisting { document_id } => {
                write!(f, "Skipping existing document: {document_id}")
            }
            Self::Ignored(reason) => f.write_str(match reason {
                IgnoreReason::MalformedPayload => "Malformed message payload skipped",
                IgnoreReason::NonJson => "Non-JSON message skipped",
                IgnoreReason::MissingObject => "Missing file path or bucket name in message",
                IgnoreReason::OutsidePrefix => "File outside target prefix skipped",
                IgnoreReason::NotPdf => "Not a PDF file",
            }),
            Self::DecodeError(reason) => write!(f, "Error decoding JSON: {reason}."),
            Self::Cleared { .. } => f.write_str("Firestore Collection Cleared"),
            Self::Failed(reason) => write!(f, "Error processing PDF: {reason}."),
        }
    }
}

/// Failures inside the extractor pipeline before they are folded into an outcome.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The model call failed.
    #[error("metadata extraction failed: {0}")]
    Model(#[source] GcpError),
    /// Reading or writing the metadata collection failed.
    #[error("metadata store request failed: {0}")]
    Store(#[source] GcpError),
    /// Forwarding the record failed.
    #[error("publishing metadata failed: {0}")]
    Publish(#[source] GcpError),
    /// The record could not be serialized.
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}
