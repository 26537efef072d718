//! Discovery Engine document imports.
//!
//! An import is a long-running operation: the client starts it, then polls the operation until
//! it reports `done` or the poll budget runs out. Every failure is folded into an
//! [`ImportStatus`] so callers only ever log the outcome.

use crate::gcp::{
    http::{GcpHttp, join_url},
    types::{GcpError, ImportStatus, Operation},
};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use std::time::Duration;

const SERVICE: &str = "discoveryengine";
const COLLECTION_ID: &str = "default_collection";

/// Search index accepting staged import files.
#[async_trait]
pub trait DocumentImporter: Send + Sync {
    /// Incrementally import the JSONL object at `gcs_uri`.
    async fn import_documents(&self, gcs_uri: &str) -> ImportStatus;
}

/// Client for one Discovery Engine data store branch.
pub struct DiscoveryEngineClient {
    pub(crate) http: GcpHttp,
    pub(crate) endpoint: String,
    pub(crate) parent: String,
    pub(crate) poll_attempts: u32,
    pub(crate) poll_interval: Duration,
}

impl DiscoveryEngineClient {
    /// Target branch `0` of `data_store` in the global location of `project`.
    pub fn new(http: GcpHttp, endpoint: impl Into<String>, project: &str, data_store: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            parent: branch_parent(project, data_store),
            poll_attempts: 60,
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Override how long the client waits for the import operation.
    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts.max(1);
        self.poll_interval = interval;
        self
    }

    async fn start_import(&self, gcs_uri: &str) -> Result<Operation, GcpError> {
        let url = join_url(
            &self.endpoint,
            &format!("v1beta/{}/documents:import", self.parent),
        );
        let body = json!({
            "gcsSource": {
                "inputUris": [gcs_uri],
                "dataSchema": "document"
            },
            "reconciliationMode": "INCREMENTAL"
        });
        let response = self
            .http
            .request(Method::POST, &url)
            .await?
            .json(&body)
            .send()
            .await?;
        GcpHttp::read_json(SERVICE, response).await
    }

    async fn get_operation(&self, name: &str) -> Result<Operation, GcpError> {
        let url = join_url(&self.endpoint, &format!("v1beta/{name}"));
        let response = self.http.request(Method::GET, &url).await?.send().await?;
        GcpHttp::read_json(SERVICE, response).await
    }

    async fn wait_for(&self, mut operation: Operation) -> Result<Operation, GcpError> {
        let mut polls = 0;
        while !operation.done {
            if polls >= self.poll_attempts {
                return Err(GcpError::invalid(
                    SERVICE,
                    format!(
                        "operation {} still running after {polls} polls",
                        operation.name
                    ),
                ));
            }
            if operation.name.is_empty() {
                return Err(GcpError::invalid(SERVICE, "operation has no name"));
            }
            tokio::time::sleep(self.poll_interval).await;
            operation = self.get_operation(&operation.name).await?;
            polls += 1;
        }
        Ok(operation)
    }

    async fn run_import(&self, gcs_uri: &str) -> Result<ImportStatus, GcpError> {
        let started = self.start_import(gcs_uri).await?;
        tracing::debug!(operation = %started.name, "Import operation started");
        let finished = self.wait_for(started).await?;

        if let Some(error) = finished.error {
            return Ok(ImportStatus::Failed(error.to_string()));
        }

        let samples: Vec<String> = finished
            .response
            .unwrap_or_default()
            .error_samples
            .iter()
            .map(ToString::to_string)
            .collect();
        if samples.is_empty() {
            Ok(ImportStatus::Completed {
                uri: gcs_uri.to_string(),
            })
        } else {
            Ok(ImportStatus::PartialErrors(samples))
        }
    }
}

#[async_trait]
impl DocumentImporter for DiscoveryEngineClient {
    async fn import_documents(&self, gcs_uri: &str) -> ImportStatus {
        tracing::info!(gcs_uri, parent = %self.parent, "Importing documents");
        let status = self
            .run_import(gcs_uri)
            .await
            .unwrap_or_else(|err| ImportStatus::Failed(err.to_string()));
        if status.is_success() {
            tracing::info!(gcs_uri, "Operation completed successfully");
        } else {
            tracing::error!(gcs_uri, status = %status, "Import did not complete cleanly");
        }
        status
    }
}

/// Resource name of the default branch of a data store.
pub fn branch_parent(project: &str, data_store: &str) -> String {
    format!(
        "projects/{project}/locations/global/collections/{COLLECTION_ID}/dataStores/{data_store}/branches/0"
    )
}
