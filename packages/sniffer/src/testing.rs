//! Testing utilities: mock collaborator implementations.
//!
//! Deterministic, configurable stand-ins for the LLM, scraping, and
//! search capabilities, with call tracking for never-invoked
//! assertions. No network, no randomness.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};

use crate::error::{CapabilityError, CapabilityResult};
use crate::schema::RecordSchema;
use crate::traits::analyzer::{Analyzer, Classification, ConfigProposal};
use crate::traits::scraper::Scraper;
use crate::traits::searcher::WebSearcher;

/// Record of a call made to [`MockAnalyzer`].
#[derive(Debug, Clone)]
pub enum AnalyzerCall {
    Classify { candidates: Vec<String> },
    GenerateConfig,
    StructuredCompletion { prompt: String },
}

/// A mock analyzer with scripted responses.
///
/// By default `structured_completion` is *faithful*: it parses the
/// `KEY NAME: .. -> KEY RELATED DATA: ..` lines out of the prompt and
/// echoes back the fields present in the target schema, so refinement
/// collapses to identity for already-clean input. Script a fixed
/// response with [`with_completion`](Self::with_completion) to
/// override that.
#[derive(Default, Clone)]
pub struct MockAnalyzer {
    classification: Arc<RwLock<Option<Classification>>>,
    classification_error: Arc<RwLock<Option<String>>>,
    proposal: Arc<RwLock<Option<ConfigProposal>>>,
    proposal_scripted: Arc<RwLock<bool>>,
    completion: Arc<RwLock<Option<Value>>>,
    calls: Arc<RwLock<Vec<AnalyzerCall>>>,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the classification result.
    pub fn with_classification(self, keyword: impl Into<String>, entity: Option<&str>) -> Self {
        let keyword = keyword.into();
        *self.classification.write().unwrap() = Some(Classification {
            is_classified: keyword.to_lowercase() != "not found",
            keyword,
            entity: entity.map(str::to_owned),
        });
        self
    }

    /// Make classification fail with a capability error.
    pub fn with_classification_error(self, message: impl Into<String>) -> Self {
        *self.classification_error.write().unwrap() = Some(message.into());
        self
    }

    /// Script the config-generation proposal.
    pub fn with_proposal(self, proposal: ConfigProposal) -> Self {
        *self.proposal.write().unwrap() = Some(proposal);
        *self.proposal_scripted.write().unwrap() = true;
        self
    }

    /// Make config generation return no usable proposal.
    pub fn with_no_proposal(self) -> Self {
        *self.proposal.write().unwrap() = None;
        *self.proposal_scripted.write().unwrap() = true;
        self
    }

    /// Script a fixed structured-completion response.
    pub fn with_completion(self, value: Value) -> Self {
        *self.completion.write().unwrap() = Some(value);
        self
    }

    /// All calls made to this mock.
    pub fn calls(&self) -> Vec<AnalyzerCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Parse `KEY NAME: <k> -> KEY RELATED DATA: <v>` lines back into
    /// an object, keeping only fields the schema names.
    fn echo_from_prompt(prompt: &str, schema: &RecordSchema) -> Value {
        let mut object = Map::new();
        for line in prompt.lines() {
            // The first serialized line may carry a "Data: " prefix.
            let Some((_, rest)) = line.split_once("KEY NAME: ") else {
                continue;
            };
            let Some((name, value)) = rest.split_once(" -> KEY RELATED DATA: ") else {
                continue;
            };
            if schema.contains_field(name) {
                object.insert(name.to_string(), Value::String(value.to_string()));
            }
        }
        Value::Object(object)
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn classify(
        &self,
        candidates: &[String],
        _urls: &[String],
        _prompt: &str,
    ) -> CapabilityResult<Classification> {
        self.calls.write().unwrap().push(AnalyzerCall::Classify {
            candidates: candidates.to_vec(),
        });
        if let Some(message) = self.classification_error.read().unwrap().clone() {
            return Err(CapabilityError::new("mock analyzer", message));
        }
        Ok(self
            .classification
            .read()
            .unwrap()
            .clone()
            .unwrap_or_default())
    }

    async fn generate_config(
        &self,
        _urls: &[String],
        _prompt: &str,
    ) -> CapabilityResult<Option<ConfigProposal>> {
        self.calls.write().unwrap().push(AnalyzerCall::GenerateConfig);
        if !*self.proposal_scripted.read().unwrap() {
            return Err(CapabilityError::new("mock analyzer", "no scripted proposal"));
        }
        Ok(self.proposal.read().unwrap().clone())
    }

    async fn structured_completion(
        &self,
        prompt: &str,
        schema: &RecordSchema,
        _model: Option<&str>,
    ) -> CapabilityResult<Value> {
        self.calls
            .write()
            .unwrap()
            .push(AnalyzerCall::StructuredCompletion {
                prompt: prompt.to_string(),
            });
        if let Some(value) = self.completion.read().unwrap().clone() {
            return Ok(value);
        }
        Ok(Self::echo_from_prompt(prompt, schema))
    }
}

/// Record of a call made to [`MockScraper`].
#[derive(Debug, Clone)]
pub enum ScraperCall {
    Extract { urls: Vec<String>, prompt: String },
    Search { query: String },
}

/// A mock scraper with a scripted extraction payload.
#[derive(Default, Clone)]
pub struct MockScraper {
    extraction: Arc<RwLock<Option<Value>>>,
    search_answer: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<Vec<ScraperCall>>>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the extraction payload (returned verbatim; wrap it in
    /// `data`/`output` envelopes to exercise the unwrapping adapter).
    pub fn with_extraction(self, payload: Value) -> Self {
        *self.extraction.write().unwrap() = Some(payload);
        self
    }

    /// Script the search answer text.
    pub fn with_search_answer(self, answer: impl Into<String>) -> Self {
        *self.search_answer.write().unwrap() = Some(answer.into());
        self
    }

    pub fn calls(&self) -> Vec<ScraperCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn extract_calls(&self) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, ScraperCall::Extract { .. }))
            .count()
    }

    pub fn search_calls(&self) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, ScraperCall::Search { .. }))
            .count()
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn extract(
        &self,
        urls: &[String],
        prompt: &str,
        _schema: &Value,
    ) -> CapabilityResult<Value> {
        self.calls.write().unwrap().push(ScraperCall::Extract {
            urls: urls.to_vec(),
            prompt: prompt.to_string(),
        });
        self.extraction
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| CapabilityError::new("mock scraper", "no scripted extraction"))
    }

    async fn search(&self, query: &str) -> CapabilityResult<String> {
        self.calls.write().unwrap().push(ScraperCall::Search {
            query: query.to_string(),
        });
        self.search_answer
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| CapabilityError::new("mock scraper", "no scripted search answer"))
    }
}

/// A mock web searcher with a scripted answer.
#[derive(Default, Clone)]
pub struct MockWebSearcher {
    answer: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockWebSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the answer text.
    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        *self.answer.write().unwrap() = Some(answer.into());
        self
    }

    /// Queries this mock has answered.
    pub fn queries(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn answer(&self, query: &str, _model: Option<&str>) -> CapabilityResult<String> {
        self.calls.write().unwrap().push(query.to_string());
        self.answer
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| CapabilityError::new("mock searcher", "no scripted answer"))
    }
}
