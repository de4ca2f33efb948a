//! Search request and response types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use supermatch_core::config::DEFAULT_SEARCH_LIMIT;
use supermatch_core::{Error, FieldType, Result};
use supermatch_store::{InterestMatch, Supervisor};

/// A search as it arrives over HTTP.
///
/// `keywords` is matched against the publications field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub research_interests: Option<String>,
    #[serde(default)]
    pub expertise: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl SearchQuery {
    /// Non-blank criteria keyed by the field they are matched against.
    pub fn criteria(&self) -> BTreeMap<FieldType, String> {
        [
            (FieldType::ResearchInterests, &self.research_interests),
            (FieldType::Expertise, &self.expertise),
            (FieldType::Publications, &self.keywords),
        ]
        .into_iter()
        .filter_map(|(field, text)| {
            let text = text.as_deref()?.trim();
            (!text.is_empty()).then(|| (field, text.to_string()))
        })
        .collect()
    }

    pub fn resolved_limit(&self) -> Result<usize> {
        resolve_limit(self.limit)
    }
}

/// Default when absent; zero or negative is a caller error.
pub fn resolve_limit(limit: Option<i64>) -> Result<usize> {
    match limit {
        None => Ok(DEFAULT_SEARCH_LIMIT),
        Some(n) if n > 0 => Ok(n as usize),
        Some(n) => Err(Error::InvalidRequest(format!(
            "limit must be a positive integer, got {}",
            n
        ))),
    }
}

/// One supervisor's merged score before it is joined with its profile.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSupervisor {
    pub supervisor_id: String,
    /// Mean over matched fields, rounded to 4 decimals.
    pub similarity: f64,
    pub matched_criteria: Vec<FieldType>,
}

/// Ranked IDs plus the criteria that could not be embedded.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    pub hits: Vec<RankedSupervisor>,
    pub degraded_criteria: Vec<FieldType>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactInfo {
    pub email: String,
    pub office: String,
}

/// A supervisor in a search response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedSupervisor {
    pub id: String,
    pub name: String,
    pub position: String,
    pub department: String,
    pub similarity: f64,
    pub matched_criteria: Vec<FieldType>,
    pub research_interests: Vec<String>,
    pub expertise: Vec<String>,
    pub publications: Vec<Value>,
    pub contact_info: ContactInfo,
}

impl MatchedSupervisor {
    pub fn from_ranked(supervisor: Supervisor, ranked: RankedSupervisor) -> Self {
        let profile = &supervisor.profile;
        let contact_str = |key: &str| {
            profile
                .get("contact_info")
                .and_then(|c| c.get(key))
                .and_then(Value::as_str)
                .map(String::from)
        };

        let contact_info = ContactInfo {
            email: contact_str("email")
                .or_else(|| supervisor.email.clone())
                .unwrap_or_default(),
            office: contact_str("office").unwrap_or_default(),
        };

        let publications = match profile.get("publications") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        Self {
            research_interests: string_list(profile.get("research_interests")),
            expertise: string_list(profile.get("expertise")),
            publications,
            contact_info,
            id: supervisor.id,
            name: supervisor.name.unwrap_or_default(),
            position: supervisor.position.unwrap_or_default(),
            department: supervisor.department.unwrap_or_default(),
            similarity: ranked.similarity,
            matched_criteria: ranked.matched_criteria,
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                Value::Object(obj) => obj
                    .get("title")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| item.to_string()),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Search response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub count: usize,
    pub supervisors: Vec<MatchedSupervisor>,
    /// Criteria skipped because the provider could not embed them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded_criteria: Vec<FieldType>,
}

/// Per-interest lookup response.
#[derive(Debug, Clone, Serialize)]
pub struct InterestMatches {
    pub count: usize,
    pub matches: Vec<InterestMatch>,
    /// True when the query could not be embedded.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keywords_map_to_publications() {
        let query: SearchQuery =
            serde_json::from_value(json!({"keywords": " graphs ", "expertise": ""})).unwrap();
        let criteria = query.criteria();
        assert_eq!(criteria.len(), 1);
        assert_eq!(criteria[&FieldType::Publications], "graphs");
    }

    #[test]
    fn test_limit_rules() {
        assert_eq!(resolve_limit(None).unwrap(), DEFAULT_SEARCH_LIMIT);
        assert_eq!(resolve_limit(Some(12)).unwrap(), 12);
        assert!(resolve_limit(Some(0)).unwrap_err().is_invalid_request());
        assert!(resolve_limit(Some(-3)).unwrap_err().is_invalid_request());
    }

    #[test]
    fn test_contact_info_fallbacks() {
        let supervisor = Supervisor {
            id: "s".into(),
            name: Some("S".into()),
            position: None,
            department: None,
            email: Some("stored@uni.edu".into()),
            profile: json!({"contact_info": {"office": "B-201"}, "expertise": "Vision"}),
            created_at: 0,
            updated_at: 0,
        };
        let ranked = RankedSupervisor {
            supervisor_id: "s".into(),
            similarity: 0.5,
            matched_criteria: vec![FieldType::Expertise],
        };

        let out = MatchedSupervisor::from_ranked(supervisor, ranked);
        assert_eq!(out.contact_info.email, "stored@uni.edu");
        assert_eq!(out.contact_info.office, "B-201");
        assert_eq!(out.expertise, vec!["Vision"]);
        assert!(out.research_interests.is_empty());
        assert_eq!(out.position, "");

        let body = serde_json::to_value(&out).unwrap();
        assert_eq!(body["matchedCriteria"], json!(["expertise"]));
        assert!(body["contactInfo"].is_object());
    }
}
