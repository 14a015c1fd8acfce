//! Extracted records: ordered field maps flowing through the pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field values treated as "not found" markers by the gap-fill stage.
const EMPTY_MARKERS: [&str; 2] = ["n/a", "not found"];

/// One extracted record: an ordered mapping from field name to value.
///
/// Created by the primary extraction stage, mutated by gap-fill and
/// refinement, then handed to persistence (no mutation after that).
/// Insertion order is preserved so generated tables and serialized
/// prompts see columns in schema order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object; `None` for any other value shape.
    pub fn from_object(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                fields: map.into_iter().collect(),
            }),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Field names in insertion order (the observed column set).
    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    /// Tag provenance: the extraction subject and the source domain.
    pub fn tag(&mut self, entity: Option<&str>, source: &str) {
        let entity_value = entity
            .map(|e| Value::String(e.to_string()))
            .unwrap_or(Value::Null);
        self.insert("entity", entity_value);
        self.insert("source", Value::String(source.to_string()));
    }

    /// The string value of the `id` field, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        match self.get("id") {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Names of fields the primary extraction left empty.
    ///
    /// A field is empty when its value is falsy, or — for non-list
    /// values — its lowercased string is a "not found" marker.
    /// List-typed values are never considered empty.
    pub fn empty_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, value)| is_empty_value(value))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Serialize to the line format the refinement prompt consumes.
    ///
    /// Braces are replaced with parentheses so the serialized data
    /// cannot collide with prompt-template placeholders downstream.
    pub fn to_prompt_lines(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.fields {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.push_str(&format!(
                "KEY NAME: {} -> KEY RELATED DATA: {}\n",
                name, rendered
            ));
        }
        out.replace('{', "(").replace('}', ")")
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => {
            s.is_empty() || EMPTY_MARKERS.contains(&s.trim().to_lowercase().as_str())
        }
        // List-shaped values never count as empty.
        Value::Array(_) => false,
        Value::Object(map) => map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_object(value).unwrap()
    }

    #[test]
    fn test_empty_fields_markers_and_falsy() {
        let r = record(json!({
            "name": "Acme",
            "phone": "",
            "email": null,
            "city": "N/A",
            "address": "Not Found",
            "tags": [],
            "score": 0,
        }));
        assert_eq!(
            r.empty_fields(),
            vec!["phone", "email", "city", "address", "score"]
        );
    }

    #[test]
    fn test_empty_fields_ignores_lists() {
        let r = record(json!({"tags": [], "name": "x"}));
        assert!(r.empty_fields().is_empty());
    }

    #[test]
    fn test_prompt_lines_replace_braces() {
        let r = record(json!({"name": "Acme", "extra": {"a": 1}}));
        let lines = r.to_prompt_lines();
        assert!(lines.contains("KEY NAME: name -> KEY RELATED DATA: Acme"));
        assert!(lines.contains("(\"a\":1)"));
        assert!(!lines.contains('{'));
        assert!(!lines.contains('}'));
    }

    #[test]
    fn test_tag_sets_entity_and_source() {
        let mut r = record(json!({"name": "Acme"}));
        r.tag(Some("Acme Corp"), "example.com");
        assert_eq!(r.get("entity"), Some(&json!("Acme Corp")));
        assert_eq!(r.get("source"), Some(&json!("example.com")));

        let mut untagged = record(json!({"name": "Acme"}));
        untagged.tag(None, "example.com");
        assert_eq!(untagged.get("entity"), Some(&Value::Null));
    }

    #[test]
    fn test_id_requires_non_empty_string() {
        assert_eq!(record(json!({"id": "abc"})).id(), Some("abc"));
        assert_eq!(record(json!({"id": ""})).id(), None);
        assert_eq!(record(json!({"id": null})).id(), None);
        assert_eq!(record(json!({"name": "x"})).id(), None);
    }
}
