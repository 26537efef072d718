//! Authenticated HTTP transport shared by every Google API client.

use crate::gcp::{auth::TokenProvider, types::GcpError};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Thin wrapper pairing a `reqwest` client with a token source.
#[derive(Clone)]
pub struct GcpHttp {
    pub(crate) client: Client,
    pub(crate) tokens: Arc<dyn TokenProvider>,
}

impl GcpHttp {
    /// Reuse an existing client, e.g. the one that also feeds the token provider.
    pub fn with_client(client: Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { client, tokens }
    }

    pub(crate) async fn request(
        &self,
        method: Method,
        url: &str,
    ) -> Result<RequestBuilder, GcpError> {
        let token = self.tokens.access_token().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    /// Decode a successful JSON response or convert the failure into [`GcpError`].
    pub(crate) async fn read_json<T: DeserializeOwned>(
        service: &'static str,
        response: Response,
    ) -> Result<T, GcpError> {
        let response = Self::ensure_success(service, response).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn ensure_success(
        service: &'static str,
        response: Response,
    ) -> Result<Response, GcpError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = GcpError::UnexpectedStatus {
            service,
            status,
            body,
        };
        tracing::error!(error = %error, "Google API request failed");
        Err(error)
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
pub(crate) fn test_transport() -> GcpHttp {
    use crate::gcp::auth::StaticToken;
    GcpHttp::with_client(
        Client::builder()
            .user_agent("lease-pipeline-test")
            .build()
            .expect("client"),
        Arc::new(StaticToken::new("test-token")),
    )
}
