//! Profile indexing: embed every field through the cache, then write the
//! supervisor and all of its vectors in one transaction.

use std::sync::Arc;

use ndarray::Array1;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::profile::SupervisorProfile;
use supermatch_core::{FieldType, Result};
use supermatch_infer::EmbeddingCache;
use supermatch_store::{ProfileWrite, SqliteStore};

/// What one `index_profile` call wrote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOutcome {
    pub supervisor_id: String,
    /// Fields whose vector was written.
    pub fields_embedded: Vec<FieldType>,
    /// Fields with text whose embedding failed. Their stored vector is zeroed
    /// so they drop out of scoring until the next successful index.
    pub degraded_fields: Vec<FieldType>,
    pub interests: usize,
    pub degraded_interests: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexFailure {
    pub id: Option<String>,
    pub error: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub indexed: usize,
    pub failures: Vec<IndexFailure>,
}

/// Turns profile records into stored supervisor and embedding rows.
pub struct ProfileIndexer {
    cache: Arc<EmbeddingCache>,
    store: Arc<SqliteStore>,
}

impl ProfileIndexer {
    pub fn new(cache: Arc<EmbeddingCache>) -> Self {
        let store = cache.store().clone();
        Self { cache, store }
    }

    /// Index one profile. All embeddings are obtained first; the store write
    /// is all-or-nothing.
    pub async fn index_profile(&self, raw: &serde_json::Value) -> Result<IndexOutcome> {
        let profile = SupervisorProfile::from_value(raw)?;

        // Degraded vectors are written as zeros: the old vector must not keep
        // ranking text the profile no longer has, and zero rows never match.
        let mut field_embeddings = Vec::new();
        let mut degraded_fields = Vec::new();
        for field in FieldType::ALL {
            let text = profile.field_text(field);
            if text.trim().is_empty() {
                continue;
            }
            let embedding = self.cache.get_or_create(&text).await?;
            if embedding.is_degraded() {
                warn!("Degraded {} embedding for {}, zeroing stored vector", field, profile.id);
                degraded_fields.push(field);
            }
            field_embeddings.push((field, embedding.vector));
        }

        let mut interests: Vec<(String, Array1<f32>)> = Vec::new();
        let mut degraded_interests = 0;
        for item in profile.interest_items() {
            let embedding = self.cache.get_or_create(&item).await?;
            if embedding.is_degraded() {
                degraded_interests += 1;
            }
            interests.push((item, embedding.vector));
        }

        let write = ProfileWrite {
            supervisor: profile.record(),
            field_embeddings,
            interests,
        };
        self.store.write_profile(&write)?;

        let outcome = IndexOutcome {
            supervisor_id: profile.id,
            fields_embedded: write
                .field_embeddings
                .iter()
                .map(|(f, _)| *f)
                .filter(|f| !degraded_fields.contains(f))
                .collect(),
            degraded_fields,
            interests: write.interests.len(),
            degraded_interests,
        };
        info!(
            "Indexed supervisor {} ({} fields, {} interests)",
            outcome.supervisor_id,
            outcome.fields_embedded.len(),
            outcome.interests
        );
        Ok(outcome)
    }

    /// Index profiles independently. A failed profile is recorded and the
    /// batch moves on; a fatal configuration error stops the batch.
    pub async fn index_all(&self, profiles: &[serde_json::Value]) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for raw in profiles {
            match self.index_profile(raw).await {
                Ok(_) => report.indexed += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let id = SupervisorProfile::from_value(raw).ok().map(|p| p.id);
                    error!("Failed to index profile {}: {}", id.as_deref().unwrap_or("<unknown>"), e);
                    report.failures.push(IndexFailure {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            "Batch indexing complete: {} indexed, {} failed",
            report.indexed,
            report.failures.len()
        );
        Ok(report)
    }
}
