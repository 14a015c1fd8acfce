//! Gemini implementation of the [`WebSearcher`] trait.
//!
//! Uses `generateContent` with the google_search grounding tool to
//! answer questions with live search results.
//!
//! Requires the `gemini` feature.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{CapabilityError, CapabilityResult};
use crate::traits::searcher::WebSearcher;

const COLLABORATOR: &str = "gemini";
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini-backed web searcher with search grounding.
#[derive(Clone)]
pub struct GeminiSearcher {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    text: Option<String>,
}

impl GeminiSearcher {
    /// Create a new searcher with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gemini-2.0-flash".to_string(),
        }
    }

    /// Create from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> CapabilityResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| CapabilityError::new(COLLABORATOR, "GEMINI_API_KEY not set"))?;
        Ok(Self::new(api_key))
    }

    /// Set the default model (default: gemini-2.0-flash).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl WebSearcher for GeminiSearcher {
    async fn answer(&self, query: &str, model: Option<&str>) -> CapabilityResult<String> {
        let model = model.unwrap_or(&self.model);
        let request = json!({
            "contents": [{ "parts": [{ "text": query }] }],
            "tools": [{ "google_search": {} }],
        });

        let response = self
            .client
            .post(format!(
                "{GEMINI_API_URL}/{model}:generateContent?key={}",
                self.api_key
            ))
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

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::new(COLLABORATOR, e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .find_map(|part| part.text)
            .ok_or_else(|| CapabilityError::new(COLLABORATOR, "no text in response"))
    }
}
