//! Use-case configuration bundles and their store.
//!
//! A use case names one class of request (e.g. "lenders") together
//! with the schema, destination table, conflict policy, and prompt
//! templates that handle it. Bundles load once per request from static
//! configuration and are read-only afterwards.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SnifferError};
use crate::pipeline::prompts;
use crate::schema::{RecordSchema, CONTACT, LENDER_TERMS};

/// Keyword of the designated fallback bundle.
pub const DEFAULT_USE_CASE: &str = "default";

/// Reference to a record shape: a built-in id or an inline schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaRef {
    Named(String),
    Inline(RecordSchema),
}

impl SchemaRef {
    pub fn named(id: impl Into<String>) -> Self {
        Self::Named(id.into())
    }
}

/// Configuration bundle for one use case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseCaseConfig {
    /// Case-insensitive identity key within the store.
    pub keyword: String,

    /// Keywords for fuzzy matching and empty-field search context.
    #[serde(default)]
    pub match_keywords: Vec<String>,

    /// Natural identifier field of a record. Shapes the destination
    /// table's unique column; the storage key is always `id`.
    #[serde(default = "default_unique_key")]
    pub unique_key: String,

    /// Destination table.
    pub table_name: String,

    /// Overwrite existing rows instead of skipping them.
    #[serde(default = "default_true")]
    pub update_if_exists: bool,

    /// The record shape extraction produces.
    pub output_schema: SchemaRef,

    /// Template text or the name of a compiled-in template.
    #[serde(default)]
    pub scraper_system_message: String,
    #[serde(default)]
    pub scraper_prompt: String,
    #[serde(default)]
    pub refinement_prompt: String,
}

fn default_unique_key() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}

/// Serialized form of the configuration document.
#[derive(Debug, Deserialize)]
struct UseCaseDocument {
    use_cases: IndexMap<String, UseCaseEntry>,
}

/// One entry in the document; the keyword comes from the map key.
#[derive(Debug, Deserialize)]
struct UseCaseEntry {
    #[serde(default)]
    match_keywords: Vec<String>,
    #[serde(default = "default_unique_key")]
    unique_key: String,
    table_name: String,
    #[serde(default = "default_true")]
    update_if_exists: bool,
    output_schema: SchemaRef,
    #[serde(default)]
    scraper_system_message: String,
    #[serde(default)]
    scraper_prompt: String,
    #[serde(default)]
    refinement_prompt: String,
}

/// The use-case configuration store.
///
/// Keys are lowercased at load time; lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct UseCaseStore {
    configs: IndexMap<String, UseCaseConfig>,
}

impl UseCaseStore {
    /// The compiled-in store: the lenders bundle plus the default
    /// fallback bundle.
    pub fn builtin() -> Self {
        let mut store = Self::default();
        store.add(UseCaseConfig {
            keyword: "lenders".to_string(),
            match_keywords: [
                "interest", "roi", "mitc", "term", "condition", "approved", "foir", "ltv",
                "lap", "home", "house", "salaried", "employed", "credit score", "score",
                "profession", "borrower", "criteria", "eligibility", "property type",
                "property",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            unique_key: "lender".to_string(),
            table_name: "lenders".to_string(),
            update_if_exists: true,
            output_schema: SchemaRef::named(LENDER_TERMS),
            scraper_system_message: prompts::LENDER_SCRAPER_SYSTEM_MESSAGE_NAME.to_string(),
            scraper_prompt: prompts::LENDER_SCRAPER_PROMPT_NAME.to_string(),
            refinement_prompt: prompts::REFINEMENT_PROMPT_NAME.to_string(),
        });
        store.add(UseCaseConfig {
            keyword: DEFAULT_USE_CASE.to_string(),
            match_keywords: vec![],
            unique_key: "name".to_string(),
            table_name: "extractions".to_string(),
            update_if_exists: true,
            output_schema: SchemaRef::named(CONTACT),
            scraper_system_message: prompts::GENERIC_SCRAPER_SYSTEM_MESSAGE_NAME.to_string(),
            scraper_prompt: prompts::GENERIC_SCRAPER_PROMPT_NAME.to_string(),
            refinement_prompt: prompts::REFINEMENT_PROMPT_NAME.to_string(),
        });
        store
    }

    /// Load from a JSON document, layered over the compiled-in store.
    ///
    /// Entries in the document add to or override the built-ins.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: UseCaseDocument = serde_json::from_str(json)?;
        let mut store = Self::builtin();
        for (keyword, entry) in document.use_cases {
            store.add(UseCaseConfig {
                keyword,
                match_keywords: entry.match_keywords,
                unique_key: entry.unique_key,
                table_name: entry.table_name,
                update_if_exists: entry.update_if_exists,
                output_schema: entry.output_schema,
                scraper_system_message: entry.scraper_system_message,
                scraper_prompt: entry.scraper_prompt,
                refinement_prompt: entry.refinement_prompt,
            });
        }
        Ok(store)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SnifferError::validation(format!(
                "cannot read use-case configuration {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json_str(&raw)
    }

    fn add(&mut self, config: UseCaseConfig) {
        self.configs.insert(config.keyword.to_lowercase(), config);
    }

    /// Known use-case keywords, excluding the fallback bundle.
    pub fn candidate_keywords(&self) -> Vec<String> {
        self.configs
            .keys()
            .filter(|k| k.as_str() != DEFAULT_USE_CASE)
            .cloned()
            .collect()
    }

    /// Case-insensitive lookup without fallback.
    pub fn get(&self, keyword: &str) -> Option<&UseCaseConfig> {
        self.configs.get(&keyword.to_lowercase())
    }

    /// The designated fallback bundle.
    pub fn default_config(&self) -> Option<&UseCaseConfig> {
        self.configs.get(DEFAULT_USE_CASE)
    }

    /// Resolve a keyword to its bundle.
    ///
    /// A bundle with an empty keyword set falls back to the default
    /// bundle; the default bundle resolves to itself.
    pub fn resolve(&self, keyword: &str) -> Option<&UseCaseConfig> {
        let config = self.get(keyword)?;
        if config.match_keywords.is_empty() && config.keyword.to_lowercase() != DEFAULT_USE_CASE {
            return self.default_config().or(Some(config));
        }
        Some(config)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let store = UseCaseStore::builtin();
        let upper = store.resolve("LENDERS").expect("uppercase resolves");
        let lower = store.resolve("lenders").expect("lowercase resolves");
        assert_eq!(upper.table_name, lower.table_name);
        assert_eq!(upper.keyword, "lenders");
    }

    #[test]
    fn test_empty_match_keywords_fall_back_to_default() {
        let json = r#"{
            "use_cases": {
                "hollow": {
                    "table_name": "hollow",
                    "output_schema": "contact"
                }
            }
        }"#;
        let store = UseCaseStore::from_json_str(json).unwrap();
        let resolved = store.resolve("hollow").expect("resolves via fallback");
        assert_eq!(resolved.keyword, DEFAULT_USE_CASE);
    }

    #[test]
    fn test_candidates_exclude_default() {
        let store = UseCaseStore::builtin();
        let candidates = store.candidate_keywords();
        assert!(candidates.contains(&"lenders".to_string()));
        assert!(!candidates.contains(&DEFAULT_USE_CASE.to_string()));
    }

    #[test]
    fn test_document_overrides_builtin() {
        let json = r#"{
            "use_cases": {
                "lenders": {
                    "match_keywords": ["mortgage"],
                    "table_name": "mortgage_lenders",
                    "output_schema": "lender_terms"
                }
            }
        }"#;
        let store = UseCaseStore::from_json_str(json).unwrap();
        let config = store.resolve("lenders").unwrap();
        assert_eq!(config.table_name, "mortgage_lenders");
    }

    #[test]
    fn test_inline_schema_deserializes() {
        let json = r#"{
            "use_cases": {
                "books": {
                    "match_keywords": ["isbn"],
                    "table_name": "books",
                    "output_schema": {
                        "name": "book",
                        "fields": [
                            {"name": "title", "kind": "string"},
                            {"name": "pages", "kind": "optional_integer"}
                        ]
                    }
                }
            }
        }"#;
        let store = UseCaseStore::from_json_str(json).unwrap();
        match &store.resolve("books").unwrap().output_schema {
            SchemaRef::Inline(schema) => assert_eq!(schema.fields.len(), 2),
            other => panic!("expected inline schema, got {other:?}"),
        }
    }
}
