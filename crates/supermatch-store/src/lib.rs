//! Supermatch Store — SQLite persistence for supervisors, per-field and
//! per-interest embeddings, and the content-addressed embedding cache.

pub mod embedding;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;
