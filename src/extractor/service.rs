//! Metadata extractor: storage notification in, stored and forwarded record out.

use crate::{
    config::Config,
    event::{FilterDecision, ObjectFilter, PushMessage, StorageObject, StorageObjectEvent},
    extractor::{
        clear::{DEFAULT_CLEAR_BATCH_SIZE, clear_collection},
        schema::{EXTRACTION_INSTRUCTION, PDF_MIME_TYPE, lease_response_schema},
        types::{ExtractionError, ExtractionOutcome, IgnoreReason, LeaseMetadata, LeaseRecord},
    },
    gcp::{ExtractionRequest, MessagePublisher, MetadataModel, MetadataStore, StoredDocument},
};
use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Field used to find an existing record for a source file.
pub const FILE_PATH_FIELD: &str = "file_path";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of the current time, replaceable in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Knobs controlling which objects are processed and how reprocessing behaves.
#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    /// Object-name prefix a PDF must live under.
    pub target_prefix: String,
    /// Overwrite stored metadata when a file is processed again.
    pub overwrite_existing: bool,
    /// Page size used by bulk-clear.
    pub clear_batch_size: usize,
}

impl ExtractorSettings {
    /// Derive settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_prefix: config.target_path_prefix.clone(),
            overwrite_existing: config.overwrite_existing_metadata,
            clear_batch_size: DEFAULT_CLEAR_BATCH_SIZE,
        }
    }
}

/// Format an instant as the `YYYY-MM-DD HH:MM:SS` Eastern-time string stored on records.
pub fn eastern_timestamp(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&New_York)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Extracts lease metadata from PDFs, deduplicates by source path, stores, and forwards it.
///
/// Built once at startup and shared by every request.
pub struct MetadataExtractor {
    model: Arc<dyn MetadataModel>,
    store: Arc<dyn MetadataStore>,
    publisher: Arc<dyn MessagePublisher>,
    filter: ObjectFilter,
    overwrite_existing: bool,
    clear_batch_size: usize,
    clock: Clock,
}

impl MetadataExtractor {
    /// Assemble an extractor from its collaborators.
    pub fn new(
        model: Arc<dyn MetadataModel>,
        store: Arc<dyn MetadataStore>,
        publisher: Arc<dyn MessagePublisher>,
        settings: ExtractorSettings,
    ) -> Self {
        Self {
            model,
            store,
            publisher,
            filter: ObjectFilter::new(&settings.target_prefix),
            overwrite_existing: settings.overwrite_existing,
            clear_batch_size: settings.clear_batch_size,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the time source.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Handle one push message carrying a storage notification or a clear request.
    pub async fn handle_message(&self, message: &PushMessage) -> ExtractionOutcome {
        if message.requests_clear() {
            tracing::info!("Clear requested through message attribute");
            return self.clear().await;
        }

        let text = match message.decode_data() {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::warn!("Received message without data");
                return ExtractionOutcome::Ignored(IgnoreReason::MalformedPayload);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Received undecodable message");
                return ExtractionOutcome::Ignored(IgnoreReason::MalformedPayload);
            }
        };

        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            tracing::info!(message = %text, "Received non-JSON message");
            return ExtractionOutcome::Ignored(IgnoreReason::NonJson);
        };

        let object = serde_json::from_value::<StorageObjectEvent>(value.clone())
            .ok()
            .and_then(StorageObjectEvent::object);
        match object {
            Some(object) => self.handle_object(&object).await,
            None => {
                tracing::error!(message = %value, "Missing file path or bucket name in message");
                ExtractionOutcome::Ignored(IgnoreReason::MissingObject)
            }
        }
    }

    /// Process a single storage object if it passes the prefix and PDF filter.
    pub async fn handle_object(&self, object: &StorageObject) -> ExtractionOutcome {
        match self.filter.check(&object.name) {
            FilterDecision::OutsidePrefix => {
                tracing::warn!(
                    file_path = %object.name,
                    prefix = %self.filter.prefix(),
                    "File path does not match target prefix"
                );
                return ExtractionOutcome::Ignored(IgnoreReason::OutsidePrefix);
            }
            FilterDecision::NotPdf => {
                tracing::info!(file_path = %object.name, "Skipping file: not a PDF");
                return ExtractionOutcome::Ignored(IgnoreReason::NotPdf);
            }
            FilterDecision::Accept => {}
        }

        match self.process(object).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(file_path = %object.gcs_uri(), error = %err, "Error processing PDF");
                ExtractionOutcome::Failed(err.to_string())
            }
        }
    }

    /// Delete every stored record.
    pub async fn clear(&self) -> ExtractionOutcome {
        tracing::info!("Cleaning up metadata collection");
        match clear_collection(self.store.as_ref(), self.clear_batch_size).await {
            Ok(deleted) => ExtractionOutcome::Cleared { deleted },
            Err(err) => {
                tracing::error!(error = %err, "Failed to clear metadata collection");
                ExtractionOutcome::Failed(ExtractionError::Store(err).to_string())
            }
        }
    }

    async fn process(&self, object: &StorageObject) -> Result<ExtractionOutcome, ExtractionError> {
        let file_path = object.gcs_uri();
        tracing::info!(file_path = %file_path, "Processing file");

        let request = ExtractionRequest {
            file_uri: file_path.clone(),
            mime_type: PDF_MIME_TYPE.to_string(),
            instruction: EXTRACTION_INSTRUCTION.to_string(),
            response_schema: lease_response_schema(),
            temperature: 0.0,
        };
        let raw = self
            .model
            .generate_json(&request)
            .await
            .map_err(ExtractionError::Model)?;
        tracing::info!(file_path = %file_path, response = %raw, "Metadata response from model");

        let metadata = match serde_json::from_str::<LeaseMetadata>(raw.trim()) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::error!(file_path = %file_path, error = %err, raw = %raw, "Error decoding model JSON");
                return Ok(ExtractionOutcome::DecodeError(err.to_string()));
            }
        };

        let now = eastern_timestamp((self.clock)());
        let existing = self
            .store
            .find_by_field(FILE_PATH_FIELD, &file_path)
            .await
            .map_err(ExtractionError::Store)?;

        let (document_id, record) = match existing {
            Some(document) if !self.overwrite_existing => {
                tracing::info!(document_id = %document.id, "Skipping existing document");
                return Ok(ExtractionOutcome::SkippedExisting {
                    document_id: document.id,
                });
            }
            Some(document) => {
                tracing::info!(document_id = %document.id, "Overwriting existing document");
                let record = LeaseRecord {
                    metadata,
                    file_path,
                    create_datetime: stored_create_datetime(&document)
                        .unwrap_or_else(|| now.clone()),
                    update_datetime: now,
                };
                self.store
                    .update(&document.id, &record_fields(&record)?)
                    .await
                    .map_err(ExtractionError::Store)?;
                (document.id, record)
            }
            None => {
                let record = LeaseRecord {
                    metadata,
                    file_path,
                    create_datetime: now.clone(),
                    update_datetime: now,
                };
                let document_id = self
                    .store
                    .insert(&record_fields(&record)?)
                    .await
                    .map_err(ExtractionError::Store)?;
                (document_id, record)
            }
        };
        tracing::info!(document_id = %document_id, "Metadata saved");

        let payload = serde_json::to_vec(&record)?;
        let message_id = self
            .publisher
            .publish(&payload)
            .await
            .map_err(ExtractionError::Publish)?;
        tracing::info!(document_id = %document_id, message_id = %message_id, "Published metadata");

        Ok(ExtractionOutcome::Processed {
            document_id,
            message_id,
        })
    }
}

fn stored_create_datetime(document: &StoredDocument) -> Option<String> {
    document
        .fields
        .get("create_datetime")
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn record_fields(record: &LeaseRecord) -> Result<Map<String, Value>, serde_json::Error> {
    Ok(match serde_json::to_value(record)? {
        Value::Object(fields) => fields,
        _ => Map::new(),
    })
}
