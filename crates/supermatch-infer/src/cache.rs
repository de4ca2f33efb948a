//! Content-addressed embedding cache.
//!
//! Keys are the SHA-256 of the trimmed text, so the same text embedded for
//! any field or supervisor resolves to one shared row. Hits refresh
//! `last_used`; nothing is evicted automatically (see `prune_embedding_cache`).

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::embedder::{truncate_chars, Embedding, EmbeddingProvider, EmbeddingSource};
use supermatch_core::config::CACHE_TEXT_PREVIEW_CHARS;
use supermatch_core::{Error, Result};
use supermatch_store::SqliteStore;

/// Persistent cache in front of an embedding provider.
pub struct EmbeddingCache {
    store: Arc<SqliteStore>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingCache {
    /// Pair a store with a provider. Their dimensions must agree.
    pub fn new(store: Arc<SqliteStore>, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        if provider.dimension() != store.embedding_dim() {
            return Err(Error::Config(format!(
                "provider dimension {} does not match store dimension {}",
                provider.dimension(),
                store.embedding_dim()
            )));
        }
        Ok(Self { store, provider })
    }

    pub fn dimension(&self) -> usize {
        self.store.embedding_dim()
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    /// Hex SHA-256 of the trimmed text. Case is preserved.
    pub fn text_hash(text: &str) -> String {
        hex::encode(Sha256::digest(text.trim().as_bytes()))
    }

    /// Return the cached vector for `text`, computing and storing it on a miss.
    ///
    /// A provider failure yields a degraded zero vector instead of an error,
    /// except for a dimension mismatch which is always returned as `Err`.
    pub async fn get_or_create(&self, text: &str) -> Result<Embedding> {
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(Error::InvalidRequest("cannot embed empty text".into()));
        }
        let hash = Self::text_hash(normalized);

        match self.store.cache_get(&hash) {
            Ok(Some(vector)) => {
                debug!("Embedding cache hit {}", &hash[..12]);
                return Ok(Embedding {
                    vector,
                    source: EmbeddingSource::Cached,
                });
            }
            Ok(None) => debug!("Embedding cache miss {}", &hash[..12]),
            Err(e) => warn!("Embedding cache lookup failed, treating as miss: {}", e),
        }

        let vector = match self.provider.embed(normalized).await {
            Ok(v) => v,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Embedding provider failed, using degraded vector: {}", e);
                return Ok(Embedding::degraded(self.dimension()));
            }
        };
        if vector.len() != self.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.dimension(),
                actual: vector.len(),
            });
        }

        let preview = truncate_chars(normalized, CACHE_TEXT_PREVIEW_CHARS);
        if let Err(e) = self.store.cache_put(&hash, preview, &vector) {
            warn!("Failed to write embedding cache entry: {}", e);
        }

        Ok(Embedding {
            vector,
            source: EmbeddingSource::Fresh,
        })
    }
}
