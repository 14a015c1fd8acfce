//! Web searcher trait: search-grounded free-text answers.

use async_trait::async_trait;

use crate::error::CapabilityResult;

/// The search-and-summarize capability.
///
/// Unlike [`crate::traits::scraper::Scraper::search`], which returns
/// raw result text for gap-filling, this answers a natural-language
/// question with a grounded summary that a downstream structuring
/// call shapes into records.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Answer a natural-language query with search-grounded text.
    async fn answer(&self, query: &str, model: Option<&str>) -> CapabilityResult<String>;
}
