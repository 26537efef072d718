//! Shared error and wire types for the Google Cloud REST clients.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Google Cloud APIs.
#[derive(Debug, Error)]
pub enum GcpError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The API responded with an unexpected status code.
    #[error("Unexpected response from {service} ({status}): {body}")]
    UnexpectedStatus {
        /// Short name of the API that failed.
        service: &'static str,
        /// HTTP status returned by the API.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The API answered successfully but the payload did not have the expected shape.
    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse {
        /// Short name of the API that answered.
        service: &'static str,
        /// Description of what was missing or malformed.
        reason: String,
    },
    /// No access token could be obtained.
    #[error("Failed to obtain access token: {0}")]
    Auth(String),
}

impl GcpError {
    pub(crate) fn invalid(service: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            reason: reason.into(),
        }
    }
}

/// Firestore document with fields decoded into plain JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Document identifier (last segment of the resource name).
    pub id: String,
    /// Decoded document fields.
    pub fields: Map<String, Value>,
}

/// Request sent to the generative model for structured extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// `gs://` URI of the document handed to the model.
    pub file_uri: String,
    /// MIME type of the referenced document.
    pub mime_type: String,
    /// Instruction accompanying the document.
    pub instruction: String,
    /// Schema the JSON answer must conform to.
    pub response_schema: Value,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Result of a search-index import, reported instead of raising.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStatus {
    /// The import finished without error samples.
    Completed {
        /// Source object that was imported.
        uri: String,
    },
    /// The import finished but reported error samples.
    PartialErrors(Vec<String>),
    /// The import could not be started or tracked to completion.
    Failed(String),
}

impl ImportStatus {
    /// Whether the import finished cleanly.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed { uri } => write!(f, "{uri}: Imported successfully!"),
            Self::PartialErrors(samples) => {
                write!(f, "Operation failed with errors: [{}]", samples.join("; "))
            }
            Self::Failed(reason) => write!(f, "Error importing documents: {reason}"),
        }
    }
}

/// Google long-running operation envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Operation {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) done: bool,
    #[serde(default)]
    pub(crate) error: Option<RpcStatus>,
    #[serde(default)]
    pub(crate) response: Option<ImportDocumentsResponse>,
}

/// `google.rpc.Status` as returned in operation errors and error samples.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcStatus {
    #[serde(default)]
    pub(crate) code: i32,
    #[serde(default)]
    pub(crate) message: String,
}

impl std::fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImportDocumentsResponse {
    #[serde(default)]
    pub(crate) error_samples: Vec<RpcStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublishResponse {
    #[serde(default)]
    pub(crate) message_ids: Vec<String>,
}

#[derive(Deserialize)]
pub(crate) struct StorageObject {
    pub(crate) bucket: String,
    pub(crate) name: String,
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FirestoreDocument {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) fields: Map<String, Value>,
}

#[derive(Deserialize)]
pub(crate) struct RunQueryItem {
    #[serde(default)]
    pub(crate) document: Option<FirestoreDocument>,
}

#[derive(Deserialize)]
pub(crate) struct ListDocumentsResponse {
    #[serde(default)]
    pub(crate) documents: Vec<FirestoreDocument>,
}

#[derive(Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
pub(crate) struct Candidate {
    #[serde(default)]
    pub(crate) content: Option<CandidateContent>,
}

#[derive(Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub(crate) parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
pub(crate) struct CandidatePart {
    #[serde(default)]
    pub(crate) text: Option<String>,
}
