//! Pub/Sub publisher for forwarding extracted records.

use crate::gcp::{
    http::{GcpHttp, join_url},
    types::{GcpError, PublishResponse},
};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Method;
use serde_json::json;

const SERVICE: &str = "pubsub";

/// Outbound message channel.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish `payload` and return the server-assigned message identifier.
    async fn publish(&self, payload: &[u8]) -> Result<String, GcpError>;
}

/// Publisher bound to a single topic.
pub struct PubSubPublisher {
    pub(crate) http: GcpHttp,
    pub(crate) publish_url: String,
}

impl PubSubPublisher {
    /// Bind to `projects/{project}/topics/{topic}`.
    pub fn new(http: GcpHttp, endpoint: &str, project: &str, topic: &str) -> Self {
        let publish_url = join_url(
            endpoint,
            &format!("v1/projects/{project}/topics/{topic}:publish"),
        );
        Self { http, publish_url }
    }
}

#[async_trait]
impl MessagePublisher for PubSubPublisher {
    async fn publish(&self, payload: &[u8]) -> Result<String, GcpError> {
        let body = json!({
            "messages": [{ "data": STANDARD.encode(payload) }]
        });
        let response = self
            .http
            .request(Method::POST, &self.publish_url)
            .await?
            .json(&body)
            .send()
            .await?;
        let PublishResponse { message_ids } = GcpHttp::read_json(SERVICE, response).await?;
        message_ids
            .into_iter()
            .next()
            .ok_or_else(|| GcpError::invalid(SERVICE, "publish returned no message id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::http::test_transport;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn publish_sends_base64_payload() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/projects/demo/topics/update-datastore-topic:publish")
                    .json_body(json!({ "messages": [{ "data": "eyJhIjoxfQ==" }] }));
                then.status(200).json_body(json!({ "messageIds": ["42"] }));
            })
            .await;

        let publisher = PubSubPublisher::new(
            test_transport(),
            &server.base_url(),
            "demo",
            "update-datastore-topic",
        );
        let id = publisher.publish(br#"{"a":1}"#).await.expect("publish");

        mock.assert();
        assert_eq!(id, "42");
    }

    #[tokio::test]
    async fn publish_without_ids_is_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({}));
            })
            .await;

        let publisher = PubSubPublisher::new(test_transport(), &server.base_url(), "p", "t");
        let err = publisher.publish(b"x").await.expect_err("no id");
        assert!(matches!(err, GcpError::InvalidResponse { .. }));
    }
}
