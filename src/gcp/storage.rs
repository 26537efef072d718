//! Cloud Storage uploads for staged import files.

use crate::gcp::{
    http::{GcpHttp, join_url},
    types::{GcpError, StorageObject},
};
use async_trait::async_trait;
use reqwest::Method;

const SERVICE: &str = "storage";

/// Object store receiving staged files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` to `bucket/object` and return its `gs://` URI.
    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, GcpError>;
}

/// Cloud Storage JSON API client using simple media uploads.
pub struct StorageClient {
    pub(crate) http: GcpHttp,
    pub(crate) endpoint: String,
}

impl StorageClient {
    /// Build a client against the given API root.
    pub fn new(http: GcpHttp, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, GcpError> {
        let url = join_url(&self.endpoint, &format!("upload/storage/v1/b/{bucket}/o"));
        let size = body.len();
        let response = self
            .http
            .request(Method::POST, &url)
            .await?
            .query(&[("uploadType", "media"), ("name", object)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        let StorageObject { bucket, name } = GcpHttp::read_json(SERVICE, response).await?;
        tracing::debug!(bucket = %bucket, object = %name, size, "Object uploaded");
        Ok(format!("gs://{bucket}/{name}"))
    }
}
