//! Supervisor profile records and searchable text extraction.
//!
//! Profiles arrive as loosely structured JSON. Only `id`/`name` are required;
//! everything else is optional and the full record is kept as the payload.

use serde_json::Value;

use supermatch_core::{Error, FieldType, Result};
use supermatch_store::SupervisorRecord;

/// A profile record with its identity resolved.
#[derive(Debug, Clone)]
pub struct SupervisorProfile {
    pub id: String,
    pub name: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub raw: Value,
}

impl SupervisorProfile {
    /// Resolve identity and contact attributes.
    ///
    /// The ID is `id` if present, otherwise a slug of `name`. A record with
    /// neither, or one that is not a JSON object, is malformed.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidRequest("profile must be a JSON object".into()))?;

        let name = non_empty_str(obj.get("name"));
        let id = match obj.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => name.as_deref().map(slugify).unwrap_or_default(),
        };
        if id.is_empty() {
            return Err(Error::InvalidRequest(
                "profile has neither an id nor a usable name".into(),
            ));
        }

        let email = non_empty_str(obj.get("email"))
            .or_else(|| non_empty_str(value.pointer("/contact_info/email")));

        Ok(Self {
            id,
            name,
            position: non_empty_str(obj.get("position")),
            department: non_empty_str(obj.get("department")),
            email,
            raw: value.clone(),
        })
    }

    /// Text to embed for one field. Empty means nothing to embed.
    pub fn field_text(&self, field: FieldType) -> String {
        extract_field_text(&self.raw, field.as_str())
    }

    /// Individual research interests in profile order. Each entry is trimmed
    /// and blank entries are dropped, so the stored interest rows mirror the
    /// non-blank entries rather than the raw list.
    pub fn interest_items(&self) -> Vec<String> {
        match self.raw.get(FieldType::ResearchInterests.as_str()) {
            Some(Value::Array(items)) => items
                .iter()
                .map(item_text)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        }
    }

    pub fn record(&self) -> SupervisorRecord {
        SupervisorRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            position: self.position.clone(),
            department: self.department.clone(),
            email: self.email.clone(),
            profile: self.raw.clone(),
        }
    }
}

/// Flatten one profile field into a single string.
///
/// Publications concatenate title, abstract and keywords per entry. Other
/// arrays join their elements with single spaces. Scalars use their string
/// form; missing or null fields give an empty string.
pub fn extract_field_text(profile: &Value, field: &str) -> String {
    let value = match profile.get(field) {
        None | Some(Value::Null) => return String::new(),
        Some(v) => v,
    };

    match value {
        Value::Array(items) if field == FieldType::Publications.as_str() => items
            .iter()
            .map(publication_text)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Array(items) => items.iter().map(item_text).collect::<Vec<_>>().join(" "),
        other => scalar_text(other),
    }
}

fn publication_text(publication: &Value) -> String {
    if !publication.is_object() {
        return item_text(publication);
    }
    let part = |key: &str| publication.get(key).map(scalar_text).unwrap_or_default();
    let keywords = match publication.get("keywords") {
        Some(Value::Array(k)) => k.iter().map(item_text).collect::<Vec<_>>().join(" "),
        Some(other) => scalar_text(other),
        None => String::new(),
    };
    format!("{} {} {}", part("title"), part("abstract"), keywords)
}

/// Text for one array element: strings as-is, objects by `title`, else JSON.
fn item_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get("title") {
            Some(Value::String(title)) => title.clone(),
            _ => item.to_string(),
        },
        other => scalar_text(other),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Lowercase ASCII slug: runs of non-alphanumerics become a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_fields_join_with_spaces() {
        let profile = json!({"research_interests": ["NLP", "Machine Translation", "Ethics"]});
        assert_eq!(
            extract_field_text(&profile, "research_interests"),
            "NLP Machine Translation Ethics"
        );
    }

    #[test]
    fn test_publications_concatenate_parts() {
        let profile = json!({
            "publications": [
                {"title": "Deep Nets", "abstract": "We study nets.", "keywords": ["dl", "cv"]},
                {"title": "Only Title"}
            ]
        });
        assert_eq!(
            extract_field_text(&profile, "publications"),
            "Deep Nets We study nets. dl cv Only Title  "
        );
    }

    #[test]
    fn test_scalar_and_missing_fields() {
        let profile = json!({"expertise": "Robotics", "publications": null, "year": 2021});
        assert_eq!(extract_field_text(&profile, "expertise"), "Robotics");
        assert_eq!(extract_field_text(&profile, "year"), "2021");
        assert_eq!(extract_field_text(&profile, "publications"), "");
        assert_eq!(extract_field_text(&profile, "research_interests"), "");
    }

    #[test]
    fn test_id_falls_back_to_name_slug() {
        let profile =
            SupervisorProfile::from_value(&json!({"name": "Dr. Ada  Lovelace-King"})).unwrap();
        assert_eq!(profile.id, "dr-ada-lovelace-king");

        let explicit =
            SupervisorProfile::from_value(&json!({"id": "ada", "name": "Ada"})).unwrap();
        assert_eq!(explicit.id, "ada");
    }

    #[test]
    fn test_profile_without_identity_is_malformed() {
        let err = SupervisorProfile::from_value(&json!({"expertise": ["x"]})).unwrap_err();
        assert!(err.is_invalid_request());
        let err = SupervisorProfile::from_value(&json!(["not", "an", "object"])).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_email_falls_back_to_contact_info() {
        let profile = SupervisorProfile::from_value(&json!({
            "id": "b",
            "contact_info": {"email": "b@uni.edu", "office": "R12"}
        }))
        .unwrap();
        assert_eq!(profile.email.as_deref(), Some("b@uni.edu"));
    }

    #[test]
    fn test_interest_items_use_title_for_objects() {
        let profile = SupervisorProfile::from_value(&json!({
            "id": "c",
            "research_interests": ["HCI", {"title": "Accessibility"}, "  ", {"area": "VR"}]
        }))
        .unwrap();
        assert_eq!(
            profile.interest_items(),
            vec!["HCI".to_string(), "Accessibility".into(), r#"{"area":"VR"}"#.into()]
        );
    }

    #[test]
    fn test_interest_items_are_trimmed_and_blanks_dropped() {
        let profile = SupervisorProfile::from_value(&json!({
            "id": "t",
            "research_interests": ["  Robotics ", "", "\tVision\n", "   "]
        }))
        .unwrap();
        assert_eq!(profile.interest_items(), vec!["Robotics".to_string(), "Vision".into()]);

        let single = SupervisorProfile::from_value(&json!({"id": "u", "research_interests": "  NLP  "}))
            .unwrap();
        assert_eq!(single.interest_items(), vec!["NLP".to_string()]);
    }
}
