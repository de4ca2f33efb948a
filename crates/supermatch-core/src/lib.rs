//! Supermatch Core — error taxonomy, configuration, searchable field types.

pub mod config;
pub mod error;
pub mod field;

pub use config::{DataPaths, EmbeddingSettings, SupermatchConfig};
pub use error::{Error, Result};
pub use field::FieldType;
