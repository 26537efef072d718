//! Datastore refresher: forwarded record in, staged import and index refresh out.

use crate::{
    config::Config,
    event::{EventError, PushMessage},
    gcp::{DocumentImporter, GcpError, ImportStatus, ObjectStore},
    refresher::record::ImportRecord,
};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Folder of the staging bucket holding import files.
pub const STAGING_FOLDER: &str = "jsonl-metadata";
const JSONL_CONTENT_TYPE: &str = "application/json";

/// Failures inside the refresher pipeline before they are folded into an outcome.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Inbound payload could not be decoded.
    #[error(transparent)]
    Event(#[from] EventError),
    /// Payload was not JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Payload was JSON but not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,
    /// Uploading the staged file failed.
    #[error("failed to stage import file: {0}")]
    Upload(#[source] GcpError),
}

/// Result of one refresher invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The message carried no payload.
    NoPayload,
    /// The record was staged and an import was requested.
    Refreshed {
        /// Identifier of the index document.
        id: String,
        /// `gs://` URI of the staged import file.
        staged_uri: String,
        /// Result reported by the import.
        status: ImportStatus,
    },
    /// Decoding or staging failed.
    Failed(String),
}

impl RefreshOutcome {
    /// Short machine-readable label.
    pub fn status(&self) -> &'static str {
        match self {
            Self::NoPayload => "no_payload",
            Self::Refreshed { status, .. } if status.is_success() => "refreshed",
            Self::Refreshed { .. } => "import_failed",
            Self::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPayload => f.write_str("No data in the Pub/Sub message."),
            Self::Refreshed { status, .. } => write!(f, "{status}"),
            Self::Failed(reason) => write!(f, "Error processing message: {reason}"),
        }
    }
}

/// Stages normalized records and asks the search index to import them.
pub struct DatastoreRefresher {
    object_store: Arc<dyn ObjectStore>,
    importer: Arc<dyn DocumentImporter>,
    staging_bucket: String,
}

impl DatastoreRefresher {
    /// Assemble a refresher writing into `staging_bucket`.
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        importer: Arc<dyn DocumentImporter>,
        staging_bucket: impl Into<String>,
    ) -> Self {
        Self {
            object_store,
            importer,
            staging_bucket: staging_bucket.into(),
        }
    }

    /// Build with the staging bucket from configuration.
    pub fn from_config(
        config: &Config,
        object_store: Arc<dyn ObjectStore>,
        importer: Arc<dyn DocumentImporter>,
    ) -> Self {
        Self::new(object_store, importer, config.metadata_bucket.clone())
    }

    /// Handle one forwarded metadata message.
    pub async fn handle_message(&self, message: &PushMessage) -> RefreshOutcome {
        tracing::info!("Processing Pub/Sub message");
        let text = match message.decode_data() {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!("No data in the Pub/Sub message");
                return RefreshOutcome::NoPayload;
            }
            Err(err) => {
                tracing::error!(error = %err, "Error decoding message");
                return RefreshOutcome::Failed(err.to_string());
            }
        };

        match self.refresh(&text).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "Error processing message");
                RefreshOutcome::Failed(err.to_string())
            }
        }
    }

    /// Stage and import the record encoded in `payload`.
    pub async fn refresh(&self, payload: &str) -> Result<RefreshOutcome, RefreshError> {
        let data = match serde_json::from_str::<Value>(payload)? {
            Value::Object(data) => data,
            _ => return Err(RefreshError::NotAnObject),
        };
        let record = ImportRecord::from_metadata(&data);
        tracing::debug!(id = %record.id, file_path = %record.content.uri, "Built import record");

        let object = format!("{STAGING_FOLDER}/{}.jsonl", record.id);
        let staged_uri = self
            .object_store
            .upload(
                &self.staging_bucket,
                &object,
                JSONL_CONTENT_TYPE,
                record.to_jsonl()?.into_bytes(),
            )
            .await
            .map_err(RefreshError::Upload)?;
        tracing::info!(staged_uri = %staged_uri, "JSONL file uploaded");

        tracing::info!("Refreshing the datastore");
        let status = self.importer.import_documents(&staged_uri).await;
        tracing::info!(id = %record.id, status = %status, "Import status");

        Ok(RefreshOutcome::Refreshed {
            id: record.id,
            staged_uri,
            status,
        })
    }
}
