//! Firecrawl implementation of the [`Scraper`] trait.
//!
//! Uses the Firecrawl API's extract and search endpoints. Extraction
//! responses keep their `data` envelope; the pipeline's unwrapping
//! adapter peels it together with any nested `output` wrapper.
//!
//! Requires the `firecrawl` feature.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{CapabilityError, CapabilityResult};
use crate::traits::scraper::Scraper;

const COLLABORATOR: &str = "firecrawl";
const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1";

/// Firecrawl-backed structured scraper.
///
/// # Example
///
/// ```rust,ignore
/// use sniffer::scrapers::FirecrawlScraper;
///
/// let scraper = FirecrawlScraper::from_env()?;
/// ```
pub struct FirecrawlScraper {
    client: Client,
    api_key: String,
    /// Result limit for search calls.
    pub search_limit: u32,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    success: bool,
    data: Option<Value>,
    error: Option<String>,
}

impl FirecrawlScraper {
    /// Create a new scraper with the given API key.
    pub fn new(api_key: impl Into<String>) -> CapabilityResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| CapabilityError::new(COLLABORATOR, e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            search_limit: 3,
        })
    }

    /// Create from the `FIRECRAWL_API_KEY` environment variable.
    pub fn from_env() -> CapabilityResult<Self> {
        let api_key = std::env::var("FIRECRAWL_API_KEY")
            .map_err(|_| CapabilityError::new(COLLABORATOR, "FIRECRAWL_API_KEY not set"))?;
        Self::new(api_key)
    }

    /// Set the search result limit (default: 3).
    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit;
        self
    }

    async fn post(&self, endpoint: &str, payload: &Value) -> CapabilityResult<ApiResponse> {
        let response = self
            .client
            .post(format!("{FIRECRAWL_API_URL}/{endpoint}"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| CapabilityError::new(COLLABORATOR, e.to_string()))?;

        if !response.status().is_success() {
            return Err(CapabilityError::new(
                COLLABORATOR,
                format!("API error: {}", response.status()),
            ));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::new(COLLABORATOR, e.to_string()))?;
        if !parsed.success {
            return Err(CapabilityError::new(
                COLLABORATOR,
                parsed.error.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        Ok(parsed)
    }
}

#[async_trait]
impl Scraper for FirecrawlScraper {
    async fn extract(
        &self,
        urls: &[String],
        prompt: &str,
        schema: &Value,
    ) -> CapabilityResult<Value> {
        let payload = json!({
            "urls": urls,
            "prompt": prompt,
            "schema": schema,
        });
        let response = self.post("extract", &payload).await?;
        // Keep the data envelope; the pipeline unwraps it.
        Ok(json!({ "data": response.data.unwrap_or(Value::Null) }))
    }

    async fn search(&self, query: &str) -> CapabilityResult<String> {
        let payload = json!({
            "query": query,
            "limit": self.search_limit,
            "timeout": 30000,
        });
        let response = self.post("search", &payload).await?;
        response
            .data
            .map(|data| data.to_string())
            .ok_or_else(|| CapabilityError::new(COLLABORATOR, "no search data"))
    }
}
