//! Data types for supervisors, embeddings and store statistics.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use supermatch_core::FieldType;

/// A supervisor row from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supervisor {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Full profile record as imported.
    pub profile: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Mutable supervisor attributes written on every import.
#[derive(Debug, Clone)]
pub struct SupervisorRecord {
    pub id: String,
    pub name: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub profile: serde_json::Value,
}

/// Everything persisted for one profile, applied in a single transaction.
#[derive(Debug, Clone)]
pub struct ProfileWrite {
    pub supervisor: SupervisorRecord,
    /// Field-level vectors to upsert. Fields absent here are left untouched.
    pub field_embeddings: Vec<(FieldType, Array1<f32>)>,
    /// Replaces the supervisor's interest rows wholesale.
    pub interests: Vec<(String, Array1<f32>)>,
}

/// One stored per-interest row.
#[derive(Debug, Clone)]
pub struct InterestEmbedding {
    pub supervisor_id: String,
    pub interest: String,
    pub embedding: Array1<f32>,
}

/// Similarity of one supervisor's stored field vector to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSimilarity {
    pub supervisor_id: String,
    pub similarity: f64,
}

/// An individual interest ranked against a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestMatch {
    pub supervisor_id: String,
    pub interest: String,
    pub similarity: f64,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub supervisors: i64,
    pub field_embeddings: i64,
    pub interest_embeddings: i64,
    pub cache_entries: i64,
    pub embedding_dimension: usize,
    pub db_path: String,
    pub db_size_mb: f64,
}
