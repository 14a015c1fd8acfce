//! The request pipeline: validate → classify → extract → persist.
//!
//! One [`Sniffer`] serves one logical request start-to-finish, in
//! order: primary extraction (Stage A), optional gap-fill search
//! (Stage B), optional refinement (Stage C), then table provisioning
//! and batch upsert. Every collaborator call is an awaited
//! round-trip; there is no internal fan-out and no retry.

pub mod extract;
pub mod gapfill;
pub mod prompts;
pub mod refine;

pub use extract::{normalize_records, primary_extraction, unwrap_envelope, PrimaryExtraction};
pub use gapfill::{gap_fill, OTHER_DATA_KEY};
pub use prompts::{compose_scraper_prompt, get_prompt, render, resolve_template};
pub use refine::refine;

use tracing::info;

use crate::classify;
use crate::error::{Result, SnifferError};
use crate::persist;
use crate::traits::{Analyzer, RecordStore, Scraper, WebSearcher};
use crate::types::{SniffOutcome, SniffRequest, UseCaseStore};

/// The extraction orchestrator, generic over its collaborators.
///
/// # Example
///
/// ```rust,ignore
/// use sniffer::{MemoryStore, Sniffer};
/// use sniffer::testing::{MockAnalyzer, MockScraper, MockWebSearcher};
///
/// let sniffer = Sniffer::new(
///     MockAnalyzer::new().with_classification("lenders", None),
///     MockScraper::new().with_extraction(payload),
///     MockWebSearcher::new(),
///     MemoryStore::new(),
/// );
/// let outcome = sniffer.process(&request).await?;
/// ```
pub struct Sniffer<A, S, W, D> {
    analyzer: A,
    scraper: S,
    searcher: W,
    store: D,
    use_cases: UseCaseStore,
}

impl<A, S, W, D> Sniffer<A, S, W, D>
where
    A: Analyzer,
    S: Scraper,
    W: WebSearcher,
    D: RecordStore,
{
    /// Create a sniffer with the compiled-in use-case store.
    pub fn new(analyzer: A, scraper: S, searcher: W, store: D) -> Self {
        Self {
            analyzer,
            scraper,
            searcher,
            store,
            use_cases: UseCaseStore::builtin(),
        }
    }

    /// Replace the use-case store (e.g. one loaded from a file).
    pub fn with_use_cases(mut self, use_cases: UseCaseStore) -> Self {
        self.use_cases = use_cases;
        self
    }

    /// Process one scrape/classify/persist request.
    pub async fn process(&self, request: &SniffRequest) -> Result<SniffOutcome> {
        request.validate()?;
        info!(urls = request.urls.len(), "processing sniff request");

        let resolved =
            classify::resolve_use_case(&self.analyzer, &self.use_cases, request).await?;
        info!(
            keyword = %resolved.config.keyword,
            table = %resolved.config.table_name,
            "use case resolved"
        );

        // Stage A.
        let primary = extract::primary_extraction(
            &self.analyzer,
            &self.scraper,
            &self.searcher,
            request,
            &resolved,
        )
        .await?;

        // Stage B: never when search was already the primary source.
        let records = if request.enable_sniffer_extraction
            && request.enable_gap_fill_search
            && !request.enable_google_search
        {
            gapfill::gap_fill(&self.scraper, primary).await?
        } else {
            primary.records
        };

        // Stage C.
        let records = if request.enable_refinement {
            refine::refine(
                &self.analyzer,
                records,
                &resolved.schema,
                &resolved.config.refinement_prompt,
            )
            .await?
        } else {
            records
        };

        if records.is_empty() {
            return Err(SnifferError::EmptyExtraction { stage: "hand-off" });
        }

        // Persistence: table before rows, always.
        let column_names = records[0].field_names();
        persist::ensure_table(
            &self.store,
            &column_names,
            &resolved.config.table_name,
            &resolved.config.unique_key,
        )
        .await?;

        let summary = persist::upsert_batch(
            &self.store,
            &records,
            &resolved.config.table_name,
            resolved.config.update_if_exists,
        )
        .await;

        Ok(SniffOutcome::success(format!(
            "{} record(s) processed into {}: {} inserted, {} updated, {} skipped, {} failed",
            summary.total_records,
            resolved.config.table_name,
            summary.inserted,
            summary.updated,
            summary.skipped,
            summary.errors,
        )))
    }
}
