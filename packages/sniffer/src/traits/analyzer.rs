//! Analyzer trait: LLM text capabilities behind one seam.
//!
//! Implementations wrap a specific provider and handle prompting and
//! response parsing. The library treats every response as a proposal,
//! not ground truth: classification falls back to the sentinel,
//! generated configs fall back to defaults, and unknown field kinds
//! degrade to optional strings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CapabilityResult;
use crate::schema::{ColumnSpec, RecordSchema};

/// Sentinel keyword the classification capability returns when no
/// known use case matches.
pub const NOT_FOUND_SENTINEL: &str = "Not Found";

/// Result of classifying a request against known use-case keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// The chosen keyword, or the sentinel.
    #[serde(default = "default_keyword")]
    pub keyword: String,

    /// The extraction subject found in the URLs or details.
    #[serde(default)]
    pub entity: Option<String>,

    /// Whether the capability considered the request classified.
    #[serde(default)]
    pub is_classified: bool,
}

fn default_keyword() -> String {
    NOT_FOUND_SENTINEL.to_string()
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
            entity: None,
            is_classified: false,
        }
    }
}

/// A proposed configuration bundle for an unrecognized use case.
///
/// Everything is optional: the proposal is model output and each gap
/// falls back to the default bundle during assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigProposal {
    #[serde(default)]
    pub usecase: Option<String>,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub unique_key: Option<String>,
    #[serde(default)]
    pub output_columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub scraper_system_message: Option<String>,
    #[serde(default)]
    pub scraper_prompt: Option<String>,
    #[serde(default)]
    pub refinement_prompt: Option<String>,
}

impl ConfigProposal {
    /// A proposal with nothing usable in it.
    pub fn is_vacant(&self) -> bool {
        *self == Self::default()
    }
}

/// LLM text capabilities consumed by classification and refinement.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Pick one keyword from `candidates` (which include the
    /// sentinel) matching the request, and extract the entity name.
    async fn classify(
        &self,
        candidates: &[String],
        urls: &[String],
        prompt: &str,
    ) -> CapabilityResult<Classification>;

    /// Propose a full configuration bundle for an unknown use case.
    ///
    /// `Ok(None)` means the capability returned nothing usable.
    async fn generate_config(
        &self,
        urls: &[String],
        prompt: &str,
    ) -> CapabilityResult<Option<ConfigProposal>>;

    /// Extract one record matching `schema` from the prompt text.
    async fn structured_completion(
        &self,
        prompt: &str,
        schema: &RecordSchema,
        model: Option<&str>,
    ) -> CapabilityResult<Value>;
}
