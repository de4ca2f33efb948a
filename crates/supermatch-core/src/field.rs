//! The closed set of embeddable profile fields.
//!
//! Field types are persisted as strings and bound as SQL parameters. They are
//! never accepted as free text from callers; anything outside this enum is
//! rejected at the boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A profile field that is embedded and searched independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    ResearchInterests,
    Expertise,
    Publications,
}

impl FieldType {
    /// Primary fields, in indexing and reporting order.
    pub const ALL: [FieldType; 3] = [
        FieldType::ResearchInterests,
        FieldType::Expertise,
        FieldType::Publications,
    ];

    /// Column value and profile key for this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResearchInterests => "research_interests",
            Self::Expertise => "expertise",
            Self::Publications => "publications",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "research_interests" => Ok(Self::ResearchInterests),
            "expertise" => Ok(Self::Expertise),
            "publications" => Ok(Self::Publications),
            other => Err(Error::InvalidRequest(format!("unknown field type: {}", other))),
        }
    }
}
