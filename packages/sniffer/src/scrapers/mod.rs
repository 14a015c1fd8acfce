//! Structured-scraping collaborator implementations.

#[cfg(feature = "firecrawl")]
pub mod firecrawl;

#[cfg(feature = "firecrawl")]
pub use firecrawl::FirecrawlScraper;
