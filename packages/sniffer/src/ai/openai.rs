//! OpenAI implementation of the [`Analyzer`] trait.
//!
//! Uses chat completions with the `json_schema` response format for
//! every call, so classification, config generation, and refinement
//! all come back as parseable JSON.
//!
//! Requires the `openai` feature.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CapabilityError, CapabilityResult};
use crate::schema::RecordSchema;
use crate::traits::analyzer::{Analyzer, Classification, ConfigProposal};

const COLLABORATOR: &str = "openai";

/// OpenAI-backed analyzer.
///
/// # Example
///
/// ```rust,ignore
/// use sniffer::ai::OpenAiAnalyzer;
///
/// let analyzer = OpenAiAnalyzer::from_env()?.with_model("gpt-4o-mini");
/// ```
#[derive(Clone)]
pub struct OpenAiAnalyzer {
    client: Client,
    api_key: String,
    model: String,
    completion_model: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: Option<String>,
}

impl OpenAiAnalyzer {
    /// Create a new analyzer with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            completion_model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> CapabilityResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CapabilityError::new(COLLABORATOR, "OPENAI_API_KEY not set"))?;
        Ok(Self::new(api_key))
    }

    /// Set the classification/generation model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the structured-completion model (default: gpt-4o).
    pub fn with_completion_model(mut self, model: impl Into<String>) -> Self {
        self.completion_model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Chat completion constrained to a JSON schema; returns the
    /// parsed message content.
    async fn structured(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: Value,
        model: &str,
    ) -> CapabilityResult<Value> {
        let request = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "strict": true,
                    "schema": schema,
                },
            },
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CapabilityError::new(COLLABORATOR, e.to_string()))?;

        if !response.status().is_success() {
            return Err(CapabilityError::new(
                COLLABORATOR,
                format!("API error: {}", response.status()),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::new(COLLABORATOR, e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CapabilityError::new(COLLABORATOR, "empty completion"))?;

        serde_json::from_str(&content)
            .map_err(|e| CapabilityError::new(COLLABORATOR, format!("malformed JSON: {e}")))
    }
}

fn classification_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "keyword": { "type": "string" },
            "entity": { "type": ["string", "null"] },
            "is_classified": { "type": "boolean" },
        },
        "required": ["keyword", "entity", "is_classified"],
        "additionalProperties": false,
    })
}

fn proposal_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "usecase": { "type": ["string", "null"] },
            "entity": { "type": ["string", "null"] },
            "keywords": { "type": "array", "items": { "type": "string" } },
            "table_name": { "type": ["string", "null"] },
            "unique_key": { "type": ["string", "null"] },
            "output_columns": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "column_name": { "type": ["string", "null"] },
                        "column_type": { "type": ["string", "null"] },
                    },
                    "required": ["column_name", "column_type"],
                    "additionalProperties": false,
                },
            },
            "scraper_system_message": { "type": ["string", "null"] },
            "scraper_prompt": { "type": ["string", "null"] },
            "refinement_prompt": { "type": ["string", "null"] },
        },
        "required": [
            "usecase", "entity", "keywords", "table_name", "unique_key",
            "output_columns", "scraper_system_message", "scraper_prompt",
            "refinement_prompt"
        ],
        "additionalProperties": false,
    })
}

#[async_trait]
impl Analyzer for OpenAiAnalyzer {
    async fn classify(
        &self,
        candidates: &[String],
        urls: &[String],
        prompt: &str,
    ) -> CapabilityResult<Classification> {
        let system = format!(
            "You are a helpful assistant whose task is to classify the data based on \
             the keywords provided.\nKeywords provided: {candidates:?}\nSelect exactly \
             one keyword matching the urls or details provided by the user; if none \
             matches, select the 'Not Found' keyword."
        );
        let user = format!(
            "Classify the data based on the urls or details provided.\nURLS: {urls:?}\nDetails: {prompt}"
        );

        let value = self
            .structured(&system, &user, "classification", classification_schema(), &self.model)
            .await?;
        serde_json::from_value(value)
            .map_err(|e| CapabilityError::new(COLLABORATOR, format!("malformed classification: {e}")))
    }

    async fn generate_config(
        &self,
        urls: &[String],
        prompt: &str,
    ) -> CapabilityResult<Option<ConfigProposal>> {
        let system = "You are a helpful assistant which can generate the configuration \
                      for a use case based on the urls or details provided by the user."
            .to_string();
        let user = format!(
            "Generate the config for the use case based on the urls or details \
             provided.\nURLS: {urls:?}\nDetails: {prompt}"
        );

        let value = self
            .structured(&system, &user, "config_proposal", proposal_schema(), &self.model)
            .await?;
        let proposal: ConfigProposal = serde_json::from_value(value)
            .map_err(|e| CapabilityError::new(COLLABORATOR, format!("malformed proposal: {e}")))?;
        Ok(Some(proposal).filter(|p| !p.is_vacant()))
    }

    async fn structured_completion(
        &self,
        prompt: &str,
        schema: &RecordSchema,
        model: Option<&str>,
    ) -> CapabilityResult<Value> {
        let model = model.unwrap_or(&self.completion_model);
        self.structured(
            "Extract the requested fields from the input text.",
            prompt,
            &schema.name,
            schema.to_json_schema(),
            model,
        )
        .await
    }
}
