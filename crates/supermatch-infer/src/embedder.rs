//! Embedding provider trait and result types.

use async_trait::async_trait;
use ndarray::Array1;

use supermatch_core::Result;

/// Where a vector returned by the cache came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingSource {
    /// Served from the persistent cache.
    Cached,
    /// Computed by the provider on this call.
    Fresh,
    /// Provider failed; the vector is the zero fallback and carries no meaning.
    Degraded,
}

/// Result of an embedding lookup.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Array1<f32>,
    pub source: EmbeddingSource,
}

impl Embedding {
    /// Zero vector standing in for a failed provider call.
    pub fn degraded(dim: usize) -> Self {
        Self {
            vector: Array1::zeros(dim),
            source: EmbeddingSource::Degraded,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.source == EmbeddingSource::Degraded
    }
}

/// Trait for embedding backends.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a text string.
    async fn embed(&self, text: &str) -> Result<Array1<f32>>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Model identifier sent upstream.
    fn model(&self) -> &str;
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
