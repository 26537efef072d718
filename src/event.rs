//! Inbound message decoding shared by both handlers.
//!
//! Both handlers receive Pub/Sub push envelopes. The extractor's payload is a Cloud Storage
//! object notification, the refresher's payload is a lease metadata record.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Attribute that turns an extractor message into a bulk-clear request.
pub const CLEAR_ATTRIBUTE: &str = "clear_firestore";

/// Errors raised while decoding an inbound payload.
#[derive(Debug, Error)]
pub enum EventError {
    /// The `data` field was not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decoded bytes were not UTF-8.
    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Body posted by a Pub/Sub push subscription.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushEnvelope {
    /// Delivered message.
    pub message: PushMessage,
    /// Subscription that delivered the message.
    #[serde(default)]
    pub subscription: Option<String>,
}

/// Single Pub/Sub message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Base64-encoded payload.
    #[serde(default)]
    pub data: Option<String>,
    /// String attributes attached by the publisher.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Server-assigned message identifier.
    #[serde(default)]
    pub message_id: Option<String>,
}

impl PushMessage {
    /// Build a message carrying `payload`, base64-encoded as Pub/Sub does.
    pub fn from_payload(payload: &[u8]) -> Self {
        Self {
            data: Some(STANDARD.encode(payload)),
            ..Self::default()
        }
    }

    /// Decode the payload into text. Returns `None` when the message carries no data.
    pub fn decode_data(&self) -> Result<Option<String>, EventError> {
        let Some(data) = self.data.as_deref().filter(|data| !data.is_empty()) else {
            return Ok(None);
        };
        let bytes = STANDARD.decode(data.trim())?;
        Ok(Some(String::from_utf8(bytes)?))
    }

    /// Whether the publisher asked for the metadata collection to be cleared.
    pub fn requests_clear(&self) -> bool {
        self.attributes
            .get(CLEAR_ATTRIBUTE)
            .is_some_and(|value| crate::config::parse_flag(value))
    }
}

/// Cloud Storage object notification. Only the fields the pipeline reads are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StorageObjectEvent {
    /// Bucket holding the object.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Object path inside the bucket.
    #[serde(default)]
    pub name: Option<String>,
}

/// Storage object with both coordinates present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    /// Bucket holding the object.
    pub bucket: String,
    /// Object path inside the bucket.
    pub name: String,
}

impl StorageObjectEvent {
    /// Return the object coordinates when both are present and non-empty.
    pub fn object(self) -> Option<StorageObject> {
        let bucket = self.bucket.filter(|value| !value.is_empty())?;
        let name = self.name.filter(|value| !value.is_empty())?;
        Some(StorageObject { bucket, name })
    }
}

impl StorageObject {
    /// Canonical `gs://bucket/name` URI.
    pub fn gcs_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.name)
    }
}

/// Result of checking an object name against the processing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// The object should be processed.
    Accept,
    /// The object lives outside the target prefix.
    OutsidePrefix,
    /// The object is not a PDF.
    NotPdf,
}

/// Selects the PDFs under the configured target prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFilter {
    prefix: String,
}

impl ObjectFilter {
    /// Build a filter for objects under `prefix/`. A trailing slash on `prefix` is tolerated.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: format!("{}/", prefix.trim_end_matches('/')),
        }
    }

    /// Prefix (with trailing slash) an object name must start with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Decide whether `name` should be processed. The prefix check runs first.
    pub fn check(&self, name: &str) -> FilterDecision {
        if !name.starts_with(&self.prefix) {
            FilterDecision::OutsidePrefix
        } else if !name.to_lowercase().ends_with(".pdf") {
            FilterDecision::NotPdf
        } else {
            FilterDecision::Accept
        }
    }
}
