//! Supermatch Infer — embedding provider and the shared embedding cache.
//!
//! The `EmbeddingProvider` trait abstracts over embedding generation;
//! `HttpEmbeddingProvider` talks to an OpenAI-compatible `/embeddings`
//! endpoint (LM Studio by default). `EmbeddingCache` sits in front of any
//! provider and persists vectors keyed by a hash of the normalized text.

pub mod cache;
pub mod embedder;
pub mod http;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::EmbeddingCache;
pub use embedder::{truncate_chars, Embedding, EmbeddingProvider, EmbeddingSource};
pub use http::HttpEmbeddingProvider;

use std::sync::Arc;

use supermatch_core::{EmbeddingSettings, Result};

/// Build the provider described by `settings`.
pub fn create_provider(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = HttpEmbeddingProvider::new(settings)?;
    tracing::info!(
        "Using embedding endpoint {} (model={}, dim={})",
        provider.endpoint(),
        provider.model(),
        provider.dimension()
    );
    Ok(Arc::new(provider))
}
