//! OAuth access tokens for Google API calls.

use crate::gcp::types::{GcpError, TokenResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Tokens are refreshed this long before the server-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens attached to every Google API request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a currently valid access token.
    async fn access_token(&self) -> Result<String, GcpError>;
}

/// Fixed token, typically supplied through `GOOGLE_OAUTH_ACCESS_TOKEN`.
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a pre-issued token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, GcpError> {
        Ok(self.0.clone())
    }
}

/// Token minted by the compute metadata server for the attached service account.
///
/// The token is cached and reused until shortly before it expires.
pub struct MetadataServerToken {
    client: Client,
    endpoint: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

impl MetadataServerToken {
    /// Build a provider querying the metadata server rooted at `endpoint`.
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<TokenResponse, GcpError> {
        let url = format!(
            "{}/computeMetadata/v1/instance/service-accounts/default/token",
            self.endpoint.trim_end_matches('/')
        );
        let response = self
            .client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|err| GcpError::Auth(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GcpError::Auth(format!(
                "metadata server answered {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|err| GcpError::Auth(err.to_string()))
    }
}

#[async_trait]
impl TokenProvider for MetadataServerToken {
    async fn access_token(&self) -> Result<String, GcpError> {
        let mut guard = self.cached.lock().await;
        if let Some(cached) = guard.as_ref()
            && Instant::now() < cached.refresh_at
        {
            return Ok(cached.value.clone());
        }

        let token = self.fetch().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        tracing::debug!(expires_in = token.expires_in, "Refreshed metadata server token");
        *guard = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}
