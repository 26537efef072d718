//! Firestore REST client for the lease metadata collection.

use crate::gcp::{
    firestore_value::{decode_fields, encode_fields, encode_value},
    http::{GcpHttp, join_url},
    types::{FirestoreDocument, GcpError, ListDocumentsResponse, RunQueryItem, StoredDocument},
};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value, json};

const SERVICE: &str = "firestore";

/// Document collection used to persist lease metadata records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Return the first document whose `field` equals `value`, if any.
    async fn find_by_field(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Option<StoredDocument>, GcpError>;

    /// Insert a new document with a generated identifier and return that identifier.
    async fn insert(&self, fields: &Map<String, Value>) -> Result<String, GcpError>;

    /// Replace the fields of an existing document.
    async fn update(&self, document_id: &str, fields: &Map<String, Value>)
    -> Result<(), GcpError>;

    /// Return up to `limit` documents from the start of the collection.
    async fn list_page(&self, limit: usize) -> Result<Vec<StoredDocument>, GcpError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, document_id: &str) -> Result<(), GcpError>;
}

/// Firestore collection accessed through the v1 REST API.
pub struct FirestoreClient {
    pub(crate) http: GcpHttp,
    /// `.../v1/projects/{project}/databases/{database}/documents`
    pub(crate) documents_url: String,
    pub(crate) collection: String,
}

impl FirestoreClient {
    /// Address `collection` inside `database` of `project`.
    pub fn new(
        http: GcpHttp,
        endpoint: &str,
        project: &str,
        database: &str,
        collection: impl Into<String>,
    ) -> Self {
        let documents_url = join_url(
            endpoint,
            &format!("v1/projects/{project}/databases/{database}/documents"),
        );
        let collection = collection.into();
        tracing::debug!(url = %documents_url, collection = %collection, "Initialized Firestore client");
        Self {
            http,
            documents_url,
            collection,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.documents_url, self.collection)
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("{}/{}", self.collection_url(), document_id)
    }
}

fn to_stored(document: FirestoreDocument) -> StoredDocument {
    let id = document
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    StoredDocument {
        id,
        fields: decode_fields(&document.fields),
    }
}

#[async_trait]
impl MetadataStore for FirestoreClient {
    async fn find_by_field(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Option<StoredDocument>, GcpError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": encode_value(&Value::String(value.to_string())),
                    }
                },
                "limit": 1
            }
        });

        let response = self
            .http
            .request(Method::POST, &format!("{}:runQuery", self.documents_url))
            .await?
            .json(&body)
            .send()
            .await?;
        let items: Vec<RunQueryItem> = GcpHttp::read_json(SERVICE, response).await?;

        Ok(items
            .into_iter()
            .find_map(|item| item.document)
            .map(to_stored))
    }

    async fn insert(&self, fields: &Map<String, Value>) -> Result<String, GcpError> {
        let response = self
            .http
            .request(Method::POST, &self.collection_url())
            .await?
            .json(&json!({ "fields": encode_fields(fields) }))
            .send()
            .await?;
        let document: FirestoreDocument = GcpHttp::read_json(SERVICE, response).await?;
        let stored = to_stored(document);
        if stored.id.is_empty() {
            return Err(GcpError::invalid(SERVICE, "created document has no name"));
        }
        tracing::debug!(collection = %self.collection, document_id = %stored.id, "Document created");
        Ok(stored.id)
    }

    async fn update(
        &self,
        document_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), GcpError> {
        let response = self
            .http
            .request(Method::PATCH, &self.document_url(document_id))
            .await?
            .json(&json!({ "fields": encode_fields(fields) }))
            .send()
            .await?;
        GcpHttp::ensure_success(SERVICE, response).await?;
        tracing::debug!(collection = %self.collection, document_id, "Document replaced");
        Ok(())
    }

    async fn list_page(&self, limit: usize) -> Result<Vec<StoredDocument>, GcpError> {
        let response = self
            .http
            .request(Method::GET, &self.collection_url())
            .await?
            .query(&[("pageSize", limit)])
            .send()
            .await?;
        let page: ListDocumentsResponse = GcpHttp::read_json(SERVICE, response).await?;
        Ok(page.documents.into_iter().map(to_stored).collect())
    }

    async fn delete(&self, document_id: &str) -> Result<(), GcpError> {
        let response = self
            .http
            .request(Method::DELETE, &self.document_url(document_id))
            .await?
            .send()
            .await?;
        GcpHttp::ensure_success(SERVICE, response).await?;
        Ok(())
    }
}
