//! Supermatch Resolve — ranks supervisors against per-field query texts.
//!
//! `MultiCriteriaSearcher` embeds each criterion through the shared cache,
//! scores it against stored vectors of the same field and merges the
//! per-field scores into one ranking.

pub mod searcher;
pub mod types;

pub use searcher::MultiCriteriaSearcher;
pub use types::*;
