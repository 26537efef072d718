//! Metadata extraction from lease PDFs.

pub mod clear;
pub mod schema;
mod service;
pub mod types;

pub use clear::{DEFAULT_CLEAR_BATCH_SIZE, clear_collection};
pub use service::{Clock, ExtractorSettings, FILE_PATH_FIELD, MetadataExtractor, eastern_timestamp};
pub use types::{
    ExtractionError, ExtractionOutcome, IgnoreReason, LeaseMetadata, LeaseRecord, RENT_UNKNOWN,
};
