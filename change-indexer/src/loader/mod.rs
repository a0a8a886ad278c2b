//! Loader module for the change indexer.
//!
//! Upserts processed documents into the search index.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::errors::IngestError;
use change_indexer_repository::{SearchIndexProvider, UpsertDocumentRequest, UpsertResult};

/// Loader that writes documents into the search index.
///
/// Each request is sent on its own and awaited before the next one, so documents reach
/// the index in the order their records were consumed. Failed upserts are reported to
/// the caller and never retried.
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
}

impl SearchLoader {
    /// Create a new search loader with the given provider.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self { provider }
    }

    /// Upsert a single document.
    #[instrument(skip(self, request), fields(index = %request.index, document_id = %request.document_id))]
    pub async fn upsert(
        &self,
        request: &UpsertDocumentRequest,
    ) -> Result<UpsertResult, IngestError> {
        let result = self.provider.upsert_document(request).await?;

        debug!(
            outcome = %result.outcome,
            version = ?result.version,
            "Document upserted"
        );

        Ok(result)
    }
}
