//! Shared application state.

use std::future::Future;
use std::sync::Arc;

use supermatch_core::{Result, SupermatchConfig};
use supermatch_index::ProfileIndexer;
use supermatch_infer::{EmbeddingCache, EmbeddingProvider};
use supermatch_resolve::MultiCriteriaSearcher;
use supermatch_store::SqliteStore;

use crate::error::ApiError;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: SupermatchConfig,
    pub store: Arc<SqliteStore>,
    pub indexer: ProfileIndexer,
    pub searcher: MultiCriteriaSearcher,
}

impl AppState {
    /// Wire the store and provider together. Fails if their dimensions differ.
    pub fn new(
        config: SupermatchConfig,
        store: Arc<SqliteStore>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let cache = Arc::new(EmbeddingCache::new(store.clone(), provider)?);
        Ok(Self {
            config,
            store,
            indexer: ProfileIndexer::new(cache.clone()),
            searcher: MultiCriteriaSearcher::new(cache),
        })
    }

    /// Bound a request by the configured timeout. In-flight provider calls are
    /// left to finish or hit their own timeout.
    pub async fn bounded<T, F>(&self, fut: F) -> std::result::Result<T, ApiError>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(_) => Err(ApiError::Timeout(self.config.request_timeout)),
        }
    }
}
