#![deny(missing_docs)]

//! Core library for the lease metadata pipeline.

/// HTTP routing for push subscriptions.
pub mod api;
/// Process-wide handler construction.
pub mod app;
/// Environment-driven configuration management.
pub mod config;
/// Inbound message decoding.
pub mod event;
/// Metadata extraction from lease PDFs.
pub mod extractor;
/// Google Cloud REST clients.
pub mod gcp;
/// Structured logging and tracing setup.
pub mod logging;
/// Search-index refresh from forwarded metadata.
pub mod refresher;

#[cfg(test)]
mod test_support;
