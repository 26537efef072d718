//! Search-index refresh from forwarded lease metadata.

pub mod record;
mod service;

pub use record::{ImportRecord, document_id};
pub use service::{DatastoreRefresher, RefreshError, RefreshOutcome, STAGING_FOLDER};
