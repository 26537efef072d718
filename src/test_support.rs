//! In-memory fakes for the external services, shared by unit tests.

use crate::gcp::{
    DocumentImporter, ExtractionRequest, GcpError, ImportStatus, MessagePublisher, MetadataModel,
    MetadataStore, ObjectStore, StoredDocument,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

fn failure(service: &'static str, body: &str) -> GcpError {
    GcpError::UnexpectedStatus {
        service,
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: body.to_string(),
    }
}

pub(crate) struct ScriptedModel {
    reply: Mutex<Result<String, String>>,
    requests: Mutex<Vec<ExtractionRequest>>,
}

impl ScriptedModel {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: Mutex::new(Ok(reply.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn fail_with(&self, reason: &str) {
        *self.reply.lock().unwrap() = Err(reason.to_string());
    }

    pub(crate) fn requests(&self) -> Vec<ExtractionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataModel for ScriptedModel {
    async fn generate_json(&self, request: &ExtractionRequest) -> Result<String, GcpError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply
            .lock()
            .unwrap()
            .clone()
            .map_err(|reason| failure("aiplatform", &reason))
    }
}

#[derive(Default)]
struct StoreState {
    documents: BTreeMap<String, Map<String, Value>>,
    next_id: usize,
    writes: usize,
    list_calls: usize,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub(crate) fn seed(&self, id: &str, fields: Value) {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.state
            .lock()
            .unwrap()
            .documents
            .insert(id.to_string(), fields);
    }

    pub(crate) fn get(&self, id: &str) -> Option<Map<String, Value>> {
        self.state.lock().unwrap().documents.get(id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().unwrap().documents.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn find_by_field(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Option<StoredDocument>, GcpError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .documents
            .iter()
            .find(|(_, fields)| fields.get(field).and_then(Value::as_str) == Some(value))
            .map(|(id, fields)| StoredDocument {
                id: id.clone(),
                fields: fields.clone(),
            }))
    }

    async fn insert(&self, fields: &Map<String, Value>) -> Result<String, GcpError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.writes += 1;
        let id = format!("doc-{}", state.next_id);
        state.documents.insert(id.clone(), fields.clone());
        Ok(id)
    }

    async fn update(
        &self,
        document_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), GcpError> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        state
            .documents
            .insert(document_id.to_string(), fields.clone());
        Ok(())
    }

    async fn list_page(&self, limit: usize) -> Result<Vec<StoredDocument>, GcpError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        Ok(state
            .documents
            .iter()
            .take(limit)
            .map(|(id, fields)| StoredDocument {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    async fn delete(&self, document_id: &str) -> Result<(), GcpError> {
        self.state.lock().unwrap().documents.remove(document_id);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingPublisher {
    messages: Mutex<Vec<Vec<u8>>>,
}

impl RecordingPublisher {
    pub(crate) fn messages(&self) -> Vec<Vec<u8>> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, payload: &[u8]) -> Result<String, GcpError> {
        let mut messages = self.messages.lock().unwrap();
        messages.push(payload.to_vec());
        Ok(format!("msg-{}", messages.len()))
    }
}

#[derive(Default)]
pub(crate) struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    unavailable: Mutex<bool>,
}

impl MemoryObjectStore {
    pub(crate) fn object(&self, bucket: &str, object: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{object}"))
            .cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub(crate) fn make_unavailable(&self) {
        *self.unavailable.lock().unwrap() = true;
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        _content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, GcpError> {
        if *self.unavailable.lock().unwrap() {
            return Err(failure("storage", "bucket unavailable"));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{object}"), body);
        Ok(format!("gs://{bucket}/{object}"))
    }
}

pub(crate) struct RecordingImporter {
    status: Option<ImportStatus>,
    uris: Mutex<Vec<String>>,
}

impl RecordingImporter {
    /// Reports a completed import for whatever URI it receives.
    pub(crate) fn succeeding() -> Self {
        Self {
            status: None,
            uris: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn answering(status: ImportStatus) -> Self {
        Self {
            status: Some(status),
            uris: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn uris(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentImporter for RecordingImporter {
    async fn import_documents(&self, gcs_uri: &str) -> ImportStatus {
        self.uris.lock().unwrap().push(gcs_uri.to_string());
        self.status.clone().unwrap_or_else(|| ImportStatus::Completed {
            uri: gcs_uri.to_string(),
        })
    }
}
