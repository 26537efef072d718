use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_VERTEX_AI_LOCATION: &str = "us-central1";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_FIRESTORE_DATABASE: &str = "lease-metadata";
const DEFAULT_FIRESTORE_COLLECTION: &str = "lease-metadata-collection";
const DEFAULT_UPDATE_TOPIC: &str = "update-datastore-topic";
const DEFAULT_TARGET_PATH_PREFIX: &str = "lease-sample";
const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_IMPORT_POLL_ATTEMPTS: u32 = 60;
const DEFAULT_IMPORT_POLL_INTERVAL_MS: u64 = 2_000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration shared by the extractor and refresher handlers.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google Cloud project identifier hosting every service.
    pub project_id: String,
    /// Project number used when addressing the Discovery Engine data store.
    pub project_number: String,
    /// Region of the Vertex AI endpoint serving the extraction model.
    pub vertex_ai_location: String,
    /// Gemini model used for metadata extraction.
    pub gemini_model: String,
    /// Firestore database holding the lease metadata collection.
    pub firestore_database: String,
    /// Firestore collection storing one document per lease PDF.
    pub firestore_collection: String,
    /// Pub/Sub topic receiving extracted records for the refresher.
    pub update_topic: String,
    /// Object-name prefix (without trailing slash) a PDF must live under to be processed.
    pub target_path_prefix: String,
    /// Whether reprocessing a known file overwrites its stored metadata.
    pub overwrite_existing_metadata: bool,
    /// Bucket receiving staged JSONL import objects.
    pub metadata_bucket: String,
    /// Discovery Engine data store refreshed by the import.
    pub data_store_id: String,
    /// Port the HTTP server binds to.
    pub server_port: u16,
    /// Static OAuth access token; when absent the metadata server is queried.
    pub access_token: Option<String>,
    /// Number of times an import operation is polled before giving up.
    pub import_poll_attempts: u32,
    /// Delay between import operation polls, in milliseconds.
    pub import_poll_interval_ms: u64,
    /// Base URLs of the Google APIs used by the pipeline.
    pub endpoints: Endpoints,
}

/// Base URLs for every Google API the pipeline talks to.
///
/// Each value can be overridden to target an emulator or a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Firestore REST API root.
    pub firestore: String,
    /// Pub/Sub REST API root.
    pub pubsub: String,
    /// Cloud Storage JSON API root.
    pub storage: String,
    /// Discovery Engine REST API root.
    pub discovery_engine: String,
    /// Vertex AI REST API root.
    pub vertex_ai: String,
    /// Compute metadata server root used for access tokens.
    pub metadata_server: String,
}

impl Endpoints {
    /// Public Google endpoints for the given Vertex AI location.
    pub fn google(vertex_ai_location: &str) -> Self {
        let vertex_ai = if vertex_ai_location == "global" {
            "https://aiplatform.googleapis.com".to_string()
        } else {
            format!("https://{vertex_ai_location}-aiplatform.googleapis.com")
        };
        Self {
            firestore: "https://firestore.googleapis.com".into(),
            pubsub: "https://pubsub.googleapis.com".into(),
            storage: "https://storage.googleapis.com".into(),
            discovery_engine: "https://discoveryengine.googleapis.com".into(),
            vertex_ai,
            metadata_server: "http://metadata.google.internal".into(),
        }
    }

    fn from_env(vertex_ai_location: &str) -> Self {
        let defaults = Self::google(vertex_ai_location);
        Self {
            firestore: load_env_or("FIRESTORE_ENDPOINT", &defaults.firestore),
            pubsub: load_env_or("PUBSUB_ENDPOINT", &defaults.pubsub),
            storage: load_env_or("STORAGE_ENDPOINT", &defaults.storage),
            discovery_engine: load_env_or("DISCOVERY_ENGINE_ENDPOINT", &defaults.discovery_engine),
            vertex_ai: load_env_or("VERTEX_AI_ENDPOINT", &defaults.vertex_ai),
            metadata_server: load_env_or("METADATA_SERVER_ENDPOINT", &defaults.metadata_server),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_id = load_env("PROJECT_ID")?;
        let vertex_ai_location = load_env_or("VERTEX_AI_LOCATION", DEFAULT_VERTEX_AI_LOCATION);
        Ok(Self {
            project_number: load_env_optional("PROJECT_NUMBER")
                .unwrap_or_else(|| project_id.clone()),
            project_id,
            gemini_model: load_env_or("GEMINI_MODEL_NAME", DEFAULT_GEMINI_MODEL),
            firestore_database: load_env_or("DB_FIRESTORE_NAME", DEFAULT_FIRESTORE_DATABASE),
            firestore_collection: load_env_or(
                "FIRESTORE_COLLECTION_NAME",
                DEFAULT_FIRESTORE_COLLECTION,
            ),
            update_topic: load_env_or("UPDATE_DATASTORE_TOPIC_ID", DEFAULT_UPDATE_TOPIC),
            target_path_prefix: load_env_or("TARGET_PATH_PREFIX", DEFAULT_TARGET_PATH_PREFIX),
            overwrite_existing_metadata: load_env_optional("OVERWRITE_EXISTING_METADATA")
                .as_deref()
                .is_some_and(parse_flag),
            metadata_bucket: load_env("METADATA_BUCKET")?,
            data_store_id: load_env("DATA_STORE_ID")?,
            server_port: parse_optional("SERVER_PORT")?.unwrap_or(DEFAULT_SERVER_PORT),
            access_token: load_env_optional("GOOGLE_OAUTH_ACCESS_TOKEN"),
            import_poll_attempts: parse_optional("IMPORT_POLL_ATTEMPTS")?
                .unwrap_or(DEFAULT_IMPORT_POLL_ATTEMPTS),
            import_poll_interval_ms: parse_optional("IMPORT_POLL_INTERVAL_MS")?
                .unwrap_or(DEFAULT_IMPORT_POLL_INTERVAL_MS),
            endpoints: Endpoints::from_env(&vertex_ai_location),
            vertex_ai_location,
        })
    }
}

/// Interpret a boolean-like flag: only `"true"` (any case) enables it.
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
///
/// Reads a `.env` file first when one is present. Calling this twice keeps the first value.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        project_id = %config.project_id,
        collection = %config.firestore_collection,
        topic = %config.update_topic,
        prefix = %config.target_path_prefix,
        overwrite = config.overwrite_existing_metadata,
        data_store = %config.data_store_id,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
