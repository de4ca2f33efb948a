//! Supermatch Index — profile records → field text → cached embeddings → store.

pub mod indexer;
pub mod profile;

pub use indexer::{BatchReport, IndexFailure, IndexOutcome, ProfileIndexer};
pub use profile::{extract_field_text, slugify, SupervisorProfile};
