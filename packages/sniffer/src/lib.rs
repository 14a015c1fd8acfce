//! Use-case classification, dynamic-schema extraction, and
//! upsert-safe persistence.
//!
//! Given a set of URLs plus free-text context, this library decides
//! which known "use case" the request belongs to, selects (or
//! synthesizes) an extraction schema and prompt configuration for it,
//! drives a scrape → search → refine pipeline producing structured
//! records, and persists the rows into a dynamically-provisioned
//! table keyed on a generated `id`.
//!
//! # Design
//!
//! - **Configuration over code**: use cases are data (keywords,
//!   schema, table, prompts), loaded once per request and read-only
//!   afterwards.
//! - **Proposals, not ground truth**: everything an LLM returns is
//!   semi-trusted; unknown keywords fall back to the sentinel,
//!   unknown field kinds degrade to optional strings, unusable
//!   proposals fall back to defaults.
//! - **One canonical shape early**: collaborator response envelopes
//!   (`data`, nested `output`, list-vs-single) are unwrapped
//!   immediately after each call, so every stage consumes a plain
//!   record list.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sniffer::{MemoryStore, Sniffer, SniffRequest};
//! use sniffer::testing::{MockAnalyzer, MockScraper, MockWebSearcher};
//!
//! let sniffer = Sniffer::new(analyzer, scraper, searcher, store);
//! let request = SniffRequest::new(["https://example-bank.test/home-loans"])
//!     .with_sniffer_extraction();
//! let outcome = sniffer.process(&request).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Capability trait abstractions (Analyzer, Scraper,
//!   WebSearcher, RecordStore)
//! - [`schema`] - Schema registry with dynamic construction
//! - [`classify`] - Use-case classification state machine
//! - [`pipeline`] - The three-stage extraction pipeline
//! - [`persist`] - Table provisioning and idempotent upserts
//! - [`stores`] - Record store implementations
//! - [`testing`] - Mock collaborators for testing

pub mod classify;
pub mod error;
pub mod persist;
pub mod pipeline;
pub mod schema;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub mod ai;
pub mod scrapers;

// Re-export core types at crate root
pub use error::{CapabilityError, SnifferError, StoreError};
pub use traits::{
    analyzer::{Analyzer, Classification, ConfigProposal, NOT_FOUND_SENTINEL},
    scraper::Scraper,
    searcher::WebSearcher,
    store::RecordStore,
};
pub use types::{
    record::Record,
    request::{SniffOutcome, SniffRequest},
    usecase::{SchemaRef, UseCaseConfig, UseCaseStore, DEFAULT_USE_CASE},
};

pub use schema::{ColumnSpec, FieldKind, FieldSpec, RecordSchema};

// Re-export the orchestrator and pipeline helpers
pub use pipeline::{
    compose_scraper_prompt, gap_fill, normalize_records, primary_extraction, refine,
    unwrap_envelope, PrimaryExtraction, Sniffer, OTHER_DATA_KEY,
};

pub use classify::{resolve_use_case, ResolvedUseCase};

// Re-export persistence operations
pub use persist::{
    build_create_table_sql, ensure_table, upsert_batch, upsert_one, upsert_with_keys,
    BatchSummary, UpsertDetail, UpsertOutcome, UpsertStatus,
};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

// Re-export collaborator implementations
#[cfg(feature = "openai")]
pub use ai::OpenAiAnalyzer;

#[cfg(feature = "gemini")]
pub use ai::GeminiSearcher;

#[cfg(feature = "firecrawl")]
pub use scrapers::FirecrawlScraper;
