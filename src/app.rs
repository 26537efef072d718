//! Process-wide handler construction.

use crate::{
    config::Config,
    extractor::{ExtractorSettings, MetadataExtractor},
    gcp::{
        DiscoveryEngineClient, FirestoreClient, GcpError, GcpHttp, GeminiClient,
        MetadataServerToken, PubSubPublisher, StaticToken, StorageClient, TokenProvider,
    },
    refresher::DatastoreRefresher,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Both handlers, built once at startup and shared across requests.
#[derive(Clone)]
pub struct AppState {
    /// Metadata extractor.
    pub extractor: Arc<MetadataExtractor>,
    /// Datastore refresher.
    pub refresher: Arc<DatastoreRefresher>,
}

impl AppState {
    /// Wire the Google API clients described by `config` into both handlers.
    pub fn from_config(config: &Config) -> Result<Self, GcpError> {
        let client = Client::builder().user_agent("lease-pipeline/0.1").build()?;
        let tokens: Arc<dyn TokenProvider> = match &config.access_token {
            Some(token) => {
                tracing::info!("Using access token from environment");
                Arc::new(StaticToken::new(token.clone()))
            }
            None => Arc::new(MetadataServerToken::new(
                client.clone(),
                config.endpoints.metadata_server.clone(),
            )),
        };
        let http = GcpHttp::with_client(client, tokens);
        let endpoints = &config.endpoints;

        let model = GeminiClient::new(
            http.clone(),
            &endpoints.vertex_ai,
            &config.project_id,
            &config.vertex_ai_location,
            &config.gemini_model,
        );
        let store = FirestoreClient::new(
            http.clone(),
            &endpoints.firestore,
            &config.project_id,
            &config.firestore_database,
            config.firestore_collection.clone(),
        );
        let publisher = PubSubPublisher::new(
            http.clone(),
            &endpoints.pubsub,
            &config.project_id,
            &config.update_topic,
        );
        let extractor = MetadataExtractor::new(
            Arc::new(model),
            Arc::new(store),
            Arc::new(publisher),
            ExtractorSettings::from_config(config),
        );

        let object_store = StorageClient::new(http.clone(), endpoints.storage.clone());
        let importer = DiscoveryEngineClient::new(
            http,
            endpoints.discovery_engine.clone(),
            &config.project_number,
            &config.data_store_id,
        )
        .with_polling(
            config.import_poll_attempts,
            Duration::from_millis(config.import_poll_interval_ms),
        );
        let refresher =
            DatastoreRefresher::from_config(config, Arc::new(object_store), Arc::new(importer));

        tracing::info!(
            project_id = %config.project_id,
            model = %config.gemini_model,
            collection = %config.firestore_collection,
            data_store = %config.data_store_id,
            "Handlers initialized"
        );
        Ok(Self {
            extractor: Arc::new(extractor),
            refresher: Arc::new(refresher),
        })
    }
}
