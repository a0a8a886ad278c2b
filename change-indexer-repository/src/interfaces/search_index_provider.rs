//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::SearchIndexError;
use crate::types::{IndexBootstrap, UpsertDocumentRequest, UpsertResult};

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// This trait defines the interface for all search index backend implementations. The
/// ingestion loop only ever depends on this trait, which keeps the store swappable and
/// lets tests run against in-memory implementations.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations.
///
/// # Note on Document Creation
///
/// There is no separate `create_document` function. `upsert_document` inserts the
/// document if its id is unknown and overwrites it otherwise, so replaying a record is
/// always safe.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check whether an index with the given name exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the index exists
    /// * `Ok(false)` - If the index does not exist
    /// * `Err(SearchIndexError)` - If the backend could not answer
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError>;

    /// Create an index with default settings and mappings.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was created
    /// * `Err(SearchIndexError::IndexAlreadyExists)` - If the index already exists
    /// * `Err(SearchIndexError)` - If creation fails for any other reason
    async fn create_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Insert or overwrite a document keyed by its identity.
    ///
    /// # Arguments
    ///
    /// * `request` - Destination index, document id and raw JSON body
    ///
    /// # Returns
    ///
    /// * `Ok(UpsertResult)` - The backend acknowledgement
    /// * `Err(SearchIndexError)` - If the backend rejected or failed the request
    async fn upsert_document(
        &self,
        request: &UpsertDocumentRequest,
    ) -> Result<UpsertResult, SearchIndexError>;

    /// Ensure the destination index exists, creating it if necessary.
    ///
    /// This method should be called during application startup, before subscribing to
    /// the broker. The check-then-create sequence is not atomic; if another instance
    /// creates the index in between, the resulting "already exists" error is treated as
    /// success. An existing index is never modified.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexBootstrap)` - Whether the index was created or already present
    /// * `Err(SearchIndexError)` - If the index could not be checked or created
    async fn ensure_index_exists(&self, index: &str) -> Result<IndexBootstrap, SearchIndexError> {
        if self.index_exists(index).await? {
            info!(index = %index, "Index already exists");
            return Ok(IndexBootstrap::AlreadyExists);
        }

        match self.create_index(index).await {
            Ok(()) => {
                info!(index = %index, "Index created");
                Ok(IndexBootstrap::Created)
            }
            Err(SearchIndexError::IndexAlreadyExists(_)) => {
                warn!(index = %index, "Index was created concurrently, using existing index");
                Ok(IndexBootstrap::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }
}
