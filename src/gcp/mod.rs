//! Google Cloud REST clients used by the pipeline.
//!
//! Each external service sits behind a small trait so the handlers can be exercised with
//! in-memory fakes.

pub mod auth;
pub mod discovery;
pub mod firestore;
pub mod firestore_value;
pub mod gemini;
pub mod http;
pub mod pubsub;
pub mod storage;
pub mod types;

pub use auth::{MetadataServerToken, StaticToken, TokenProvider};
pub use discovery::{DiscoveryEngineClient, DocumentImporter};
pub use firestore::{FirestoreClient, MetadataStore};
pub use gemini::{GeminiClient, MetadataModel};
pub use http::GcpHttp;
pub use pubsub::{MessagePublisher, PubSubPublisher};
pub use storage::{ObjectStore, StorageClient};
pub use types::{ExtractionRequest, GcpError, ImportStatus, StoredDocument};
