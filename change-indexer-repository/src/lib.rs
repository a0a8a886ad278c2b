//! # Change Indexer Repository
//!
//! This crate provides traits and implementations for interacting with the
//! search index. It includes definitions for errors, interfaces, connection
//! settings and a concrete implementation for OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use config::{BasicCredentials, ConnectionSettings};
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use opensearch::OpenSearchProvider;
pub use types::{IndexBootstrap, UpsertDocumentRequest, UpsertOutcome, UpsertResult};
