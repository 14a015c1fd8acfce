//! Scraper trait: structured extraction over URLs plus raw search.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CapabilityResult;

/// The structured-scraping capability.
///
/// Responses follow a loose envelope convention: the payload may be a
/// single mapping or a list, optionally nested under `data` and then
/// `output`. The pipeline unwraps all of it immediately after the
/// call (see [`crate::pipeline::extract::unwrap_envelope`]) so only
/// one canonical shape flows downstream.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Fetch the URLs and extract fields matching `schema`, guided by
    /// the composed prompt.
    async fn extract(
        &self,
        urls: &[String],
        prompt: &str,
        schema: &Value,
    ) -> CapabilityResult<Value>;

    /// Web search returning supplementary text for gap-filling.
    async fn search(&self, query: &str) -> CapabilityResult<String>;
}
