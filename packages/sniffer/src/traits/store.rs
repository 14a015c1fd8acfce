//! Record store trait: the datastore capability.
//!
//! Tables are provisioned at runtime from observed column names, so
//! the contract is deliberately schemaless: existence probe, raw DDL
//! execution, and row access by column equality. The storage key is
//! always the literal `id` column regardless of the use case's
//! semantic unique key.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;
use crate::types::Record;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Zero-row probe. `Ok(false)` when the table is missing;
    /// `Err` only for connection-level failures.
    async fn table_exists(&self, table: &str) -> StoreResult<bool>;

    /// Execute a DDL statement verbatim.
    async fn execute_ddl(&self, sql: &str) -> StoreResult<()>;

    /// Fetch one row by its `id` column.
    async fn find_by_id(&self, table: &str, id: &str) -> StoreResult<Option<Record>>;

    /// Fetch rows matching every (column, value) filter.
    async fn find_by_columns(
        &self,
        table: &str,
        filters: &[(String, Value)],
    ) -> StoreResult<Vec<Record>>;

    /// Insert a record; returns the stored row.
    async fn insert(&self, table: &str, record: &Record) -> StoreResult<Record>;

    /// Overwrite the record's columns on the row with this `id`;
    /// returns the updated row.
    async fn update(&self, table: &str, id: &str, record: &Record) -> StoreResult<Record>;

    /// Overwrite matching rows' columns; returns the updated rows.
    async fn update_by_columns(
        &self,
        table: &str,
        filters: &[(String, Value)],
        record: &Record,
    ) -> StoreResult<Vec<Record>>;
}
