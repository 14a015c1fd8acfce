//! Integration tests for the full request pipeline:
//! validate → classify → extract → gap-fill → refine → persist.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{json, Value};

use sniffer::error::{StoreError, StoreResult};
use sniffer::persist::{self, UpsertStatus};
use sniffer::testing::{MockAnalyzer, MockScraper, MockWebSearcher};
use sniffer::{
    ConfigProposal, MemoryStore, Record, RecordStore, SniffRequest, Sniffer, SnifferError,
    NOT_FOUND_SENTINEL,
};

/// Helper to create a record from a JSON object.
fn record(value: Value) -> Record {
    Record::from_object(value).unwrap()
}

/// Helper to assemble a sniffer while keeping handles on the mocks
/// and the store (mocks share state across clones).
struct Harness {
    analyzer: MockAnalyzer,
    scraper: MockScraper,
    searcher: MockWebSearcher,
    store: std::sync::Arc<MemoryStore>,
}

impl Harness {
    fn new(analyzer: MockAnalyzer, scraper: MockScraper, searcher: MockWebSearcher) -> Self {
        Self {
            analyzer,
            scraper,
            searcher,
            store: std::sync::Arc::new(MemoryStore::new()),
        }
    }

    fn sniffer(&self) -> Sniffer<MockAnalyzer, MockScraper, MockWebSearcher, SharedStore> {
        Sniffer::new(
            self.analyzer.clone(),
            self.scraper.clone(),
            self.searcher.clone(),
            SharedStore(self.store.clone()),
        )
    }
}

/// Store wrapper sharing one [`MemoryStore`] across sniffer and test.
struct SharedStore(std::sync::Arc<MemoryStore>);

#[async_trait]
impl RecordStore for SharedStore {
    async fn table_exists(&self, table: &str) -> StoreResult<bool> {
        self.0.table_exists(table).await
    }
    async fn execute_ddl(&self, sql: &str) -> StoreResult<()> {
        self.0.execute_ddl(sql).await
    }
    async fn find_by_id(&self, table: &str, id: &str) -> StoreResult<Option<Record>> {
        self.0.find_by_id(table, id).await
    }
    async fn find_by_columns(
        &self,
        table: &str,
        filters: &[(String, Value)],
    ) -> StoreResult<Vec<Record>> {
        self.0.find_by_columns(table, filters).await
    }
    async fn insert(&self, table: &str, record: &Record) -> StoreResult<Record> {
        self.0.insert(table, record).await
    }
    async fn update(&self, table: &str, id: &str, record: &Record) -> StoreResult<Record> {
        self.0.update(table, id, record).await
    }
    async fn update_by_columns(
        &self,
        table: &str,
        filters: &[(String, Value)],
        record: &Record,
    ) -> StoreResult<Vec<Record>> {
        self.0.update_by_columns(table, filters, record).await
    }
}

fn lenders_request() -> SniffRequest {
    SniffRequest::new(["https://example-bank.test/home-loans"]).with_sniffer_extraction()
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_known_use_case_inserts_one_row() {
    let harness = Harness::new(
        MockAnalyzer::new().with_classification("lenders", Some("Example Bank")),
        MockScraper::new().with_extraction(json!({"name": "X", "phone": "123"})),
        MockWebSearcher::new(),
    );

    let outcome = harness.sniffer().process(&lenders_request()).await.unwrap();
    assert!(outcome.success);
    assert!(outcome.message.contains("1 inserted"));

    let rows = harness.store.rows("lenders");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.get("name"), Some(&json!("X")));
    assert_eq!(row.get("entity"), Some(&json!("Example Bank")));
    assert_eq!(row.get("source"), Some(&json!("example-bank.test")));
    assert!(row.id().is_some(), "a storage id must be generated");
}

#[tokio::test]
async fn test_second_run_updates_same_natural_identity() {
    let harness = Harness::new(
        MockAnalyzer::new().with_classification("lenders", None),
        MockScraper::new()
            .with_extraction(json!({"id": "lender-x", "name": "X", "phone": "123"})),
        MockWebSearcher::new(),
    );
    let sniffer = harness.sniffer();

    let first = sniffer.process(&lenders_request()).await.unwrap();
    assert!(first.message.contains("1 inserted"));

    let second = sniffer.process(&lenders_request()).await.unwrap();
    assert!(second.message.contains("1 updated"), "got: {}", second.message);
    assert!(second.message.contains("0 inserted"));
    assert_eq!(harness.store.row_count("lenders"), 1);
}

#[tokio::test]
async fn test_no_mode_selected_is_rejected_before_any_call() {
    let harness = Harness::new(MockAnalyzer::new(), MockScraper::new(), MockWebSearcher::new());

    let err = harness
        .sniffer()
        .process(&SniffRequest::new(["https://example.com"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SnifferError::Validation { .. }));

    assert_eq!(harness.analyzer.call_count(), 0);
    assert_eq!(harness.scraper.calls().len(), 0);
    assert_eq!(harness.searcher.queries().len(), 0);
}

#[tokio::test]
async fn test_sentinel_with_empty_field_list_falls_back_to_contact() {
    let proposal = ConfigProposal {
        usecase: Some("directory".into()),
        table_name: Some("directory".into()),
        unique_key: Some("name".into()),
        output_columns: vec![],
        ..Default::default()
    };
    let harness = Harness::new(
        MockAnalyzer::new()
            .with_classification(NOT_FOUND_SENTINEL, None)
            .with_proposal(proposal),
        MockScraper::new()
            .with_extraction(json!({"data": {"output": [{"name": "A", "phone": "1"}]}})),
        MockWebSearcher::new(),
    );

    let outcome = harness
        .sniffer()
        .process(&SniffRequest::new(["https://directory.test"]).with_sniffer_extraction())
        .await
        .unwrap();
    assert!(outcome.success);
    assert!(harness.store.has_table("directory"));
    assert_eq!(harness.store.row_count("directory"), 1);
}

#[tokio::test]
async fn test_classification_failure_aborts_before_extraction() {
    let harness = Harness::new(
        MockAnalyzer::new().with_classification_error("model unavailable"),
        MockScraper::new().with_extraction(json!({"name": "X"})),
        MockWebSearcher::new(),
    );

    let err = harness
        .sniffer()
        .process(&lenders_request())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SnifferError::Capability {
            stage: "classification",
            ..
        }
    ));
    assert_eq!(harness.scraper.extract_calls(), 0);
}

#[tokio::test]
async fn test_empty_extraction_is_terminal() {
    let harness = Harness::new(
        MockAnalyzer::new().with_classification("lenders", None),
        MockScraper::new().with_extraction(json!({"data": []})),
        MockWebSearcher::new(),
    );

    let err = harness
        .sniffer()
        .process(&lenders_request())
        .await
        .unwrap_err();
    assert!(matches!(err, SnifferError::EmptyExtraction { .. }));
    assert_eq!(harness.store.row_count("lenders"), 0);
}

#[tokio::test]
async fn test_search_mode_structures_the_answer() {
    let harness = Harness::new(
        MockAnalyzer::new()
            .with_classification("lenders", Some("Example Bank"))
            .with_completion(json!({"lender": "Example Bank", "interest_rate_range": "8.5-9.5"})),
        MockScraper::new(),
        MockWebSearcher::new().with_answer("Interest rates range from 8.5 to 9.5 percent."),
    );

    let request =
        SniffRequest::new(["https://example-bank.test/home-loans"]).with_google_search();
    let outcome = harness.sniffer().process(&request).await.unwrap();
    assert!(outcome.success);

    assert_eq!(harness.searcher.queries().len(), 1);
    assert!(harness.searcher.queries()[0].contains("example-bank.test"));
    // Search mode never touches the scraper.
    assert_eq!(harness.scraper.calls().len(), 0);

    let rows = harness.store.rows("lenders");
    assert_eq!(rows[0].get("lender"), Some(&json!("Example Bank")));
}

// ---------------------------------------------------------------------------
// Gap-fill behavior
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_gap_fill_skips_records_with_no_empty_fields() {
    let harness = Harness::new(
        MockAnalyzer::new().with_classification("lenders", Some("X Corp")),
        MockScraper::new().with_extraction(json!({"name": "X", "phone": "123"})),
        MockWebSearcher::new(),
    );

    let request = lenders_request().with_gap_fill_search();
    harness.sniffer().process(&request).await.unwrap();

    assert_eq!(harness.scraper.search_calls(), 0);
    let rows = harness.store.rows("lenders");
    assert!(rows[0].get("other_data").is_none());
}

#[tokio::test]
async fn test_gap_fill_searches_once_per_record_with_empty_fields() {
    let harness = Harness::new(
        MockAnalyzer::new().with_classification("lenders", Some("X Corp")),
        MockScraper::new()
            .with_extraction(json!({"name": "X", "phone": "n/a", "email": ""}))
            .with_search_answer("phone 123, email x@example.com"),
        MockWebSearcher::new(),
    );

    let request = lenders_request().with_gap_fill_search();
    harness.sniffer().process(&request).await.unwrap();

    assert_eq!(harness.scraper.search_calls(), 1);
    let calls = harness.scraper.calls();
    let query = calls
        .iter()
        .find_map(|call| match call {
            sniffer::testing::ScraperCall::Search { query } => Some(query.clone()),
            _ => None,
        })
        .unwrap();
    // One query joining the empty field names, not one call per field.
    assert!(query.contains("phone"));
    assert!(query.contains("email"));

    let rows = harness.store.rows("lenders");
    assert_eq!(
        rows[0].get("other_data"),
        Some(&json!("phone 123, email x@example.com"))
    );
}

#[tokio::test]
async fn test_gap_fill_passes_list_shaped_results_through() {
    let harness = Harness::new(
        MockAnalyzer::new().with_classification("lenders", None),
        MockScraper::new()
            .with_extraction(json!([{"name": "A", "phone": ""}, {"name": "B", "phone": ""}])),
        MockWebSearcher::new(),
    );

    let request = lenders_request().with_gap_fill_search();
    harness.sniffer().process(&request).await.unwrap();

    // List-shaped record sets skip gap-fill entirely.
    assert_eq!(harness.scraper.search_calls(), 0);
    assert_eq!(harness.store.row_count("lenders"), 2);
}

// ---------------------------------------------------------------------------
// Refinement round-trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_clean_record_survives_gap_fill_and_refinement_unchanged() {
    // Faithful completion: the default MockAnalyzer echoes the
    // serialized fields back, restricted to the schema.
    let proposal = ConfigProposal {
        usecase: Some("contacts".into()),
        table_name: Some("contacts".into()),
        output_columns: vec![],
        ..Default::default()
    };
    let harness = Harness::new(
        MockAnalyzer::new()
            .with_classification(NOT_FOUND_SENTINEL, Some("Acme"))
            .with_proposal(proposal),
        MockScraper::new().with_extraction(json!({"name": "Acme", "phone": "123"})),
        MockWebSearcher::new(),
    );

    let request = SniffRequest::new(["https://acme.test"])
        .with_sniffer_extraction()
        .with_gap_fill_search()
        .with_refinement();
    harness.sniffer().process(&request).await.unwrap();

    let rows = harness.store.rows("contacts");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.get("name"), Some(&json!("Acme")));
    assert_eq!(row.get("phone"), Some(&json!("123")));
    // Provenance survives refinement; the gap-fill key does not.
    assert_eq!(row.get("entity"), Some(&json!("Acme")));
    assert_eq!(row.get("source"), Some(&json!("acme.test")));
    assert!(row.get("other_data").is_none());
}

#[tokio::test]
async fn test_refinement_with_no_response_is_terminal() {
    let harness = Harness::new(
        MockAnalyzer::new()
            .with_classification("lenders", None)
            .with_completion(json!([])),
        MockScraper::new().with_extraction(json!({"name": "X", "phone": "1"})),
        MockWebSearcher::new(),
    );

    let err = harness
        .sniffer()
        .process(&lenders_request().with_refinement())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SnifferError::EmptyExtraction { stage: "refinement" }
    ));
    assert_eq!(harness.store.row_count("lenders"), 0);
}

// ---------------------------------------------------------------------------
// Upsert idempotence and batch accounting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_upsert_one_idempotent_without_update() {
    let store = MemoryStore::new();
    persist::ensure_table(&store, &["name".to_string()], "t", "name")
        .await
        .unwrap();
    let r = record(json!({"id": "1", "name": "first"}));

    let first = persist::upsert_one(&store, &r, "t", false).await;
    assert_eq!(first.status, UpsertStatus::Inserted);
    let stored_after_first = store.rows("t");

    let second = persist::upsert_one(&store, &r, "t", false).await;
    assert_eq!(second.status, UpsertStatus::Skipped);
    assert!(second.existing.is_some());
    assert_eq!(store.rows("t"), stored_after_first);
}

#[tokio::test]
async fn test_upsert_one_overwrites_with_update() {
    let store = MemoryStore::new();
    persist::ensure_table(&store, &["name".to_string()], "t", "name")
        .await
        .unwrap();

    let first = persist::upsert_one(&store, &record(json!({"id": "1", "name": "old"})), "t", true).await;
    assert_eq!(first.status, UpsertStatus::Inserted);

    let second =
        persist::upsert_one(&store, &record(json!({"id": "1", "name": "new"})), "t", true).await;
    assert_eq!(second.status, UpsertStatus::Updated);

    let rows = store.rows("t");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&json!("new")));
    assert!(rows[0].contains("created_at"));
    assert!(rows[0].contains("updated_at"));
}

/// Store wrapper that fails inserts for chosen ids.
struct FlakyStore {
    inner: MemoryStore,
    fail_ids: HashSet<String>,
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn table_exists(&self, table: &str) -> StoreResult<bool> {
        self.inner.table_exists(table).await
    }
    async fn execute_ddl(&self, sql: &str) -> StoreResult<()> {
        self.inner.execute_ddl(sql).await
    }
    async fn find_by_id(&self, table: &str, id: &str) -> StoreResult<Option<Record>> {
        self.inner.find_by_id(table, id).await
    }
    async fn find_by_columns(
        &self,
        table: &str,
        filters: &[(String, Value)],
    ) -> StoreResult<Vec<Record>> {
        self.inner.find_by_columns(table, filters).await
    }
    async fn insert(&self, table: &str, record: &Record) -> StoreResult<Record> {
        if record.id().is_some_and(|id| self.fail_ids.contains(id)) {
            return Err(StoreError::new("injected insert failure"));
        }
        self.inner.insert(table, record).await
    }
    async fn update(&self, table: &str, id: &str, record: &Record) -> StoreResult<Record> {
        self.inner.update(table, id, record).await
    }
    async fn update_by_columns(
        &self,
        table: &str,
        filters: &[(String, Value)],
        record: &Record,
    ) -> StoreResult<Vec<Record>> {
        self.inner.update_by_columns(table, filters, record).await
    }
}

#[tokio::test]
async fn test_batch_counts_failures_without_aborting() {
    let store = FlakyStore {
        inner: MemoryStore::new(),
        fail_ids: HashSet::from(["2".to_string(), "4".to_string()]),
    };
    persist::ensure_table(&store, &["name".to_string()], "t", "name")
        .await
        .unwrap();

    let records: Vec<Record> = (1..=5)
        .map(|i| record(json!({"id": i.to_string(), "name": format!("r{i}")})))
        .collect();
    let summary = persist::upsert_batch(&store, &records, "t", true).await;

    assert_eq!(summary.total_records, 5);
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.details.len(), 5);
    // Records after a failure still get processed, in input order.
    assert_eq!(summary.details[4].index, 4);
    assert_eq!(summary.details[4].status, UpsertStatus::Inserted);
    assert_eq!(store.inner.row_count("t"), 3);
}

#[tokio::test]
async fn test_upsert_with_keys_requires_all_unique_fields() {
    let store = MemoryStore::new();
    persist::ensure_table(&store, &["name".to_string(), "city".to_string()], "t", "name")
        .await
        .unwrap();

    let outcome = persist::upsert_with_keys(
        &store,
        &record(json!({"name": "x"})),
        "t",
        &["name".to_string(), "city".to_string()],
        true,
    )
    .await;
    assert_eq!(outcome.status, UpsertStatus::Error);
    assert!(outcome.message.contains("city"));

    let inserted = persist::upsert_with_keys(
        &store,
        &record(json!({"name": "x", "city": "Pune"})),
        "t",
        &["name".to_string(), "city".to_string()],
        true,
    )
    .await;
    assert_eq!(inserted.status, UpsertStatus::Inserted);

    let updated = persist::upsert_with_keys(
        &store,
        &record(json!({"name": "x", "city": "Pune", "phone": "9"})),
        "t",
        &["name".to_string(), "city".to_string()],
        true,
    )
    .await;
    assert_eq!(updated.status, UpsertStatus::Updated);
    assert_eq!(store.row_count("t"), 1);
}
