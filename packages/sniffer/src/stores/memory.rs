//! In-memory record store for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::RecordStore;
use crate::types::Record;

/// In-memory tables of rows keyed by `id`.
///
/// Useful for testing and development; data is lost on drop. Rows
/// get `created_at`/`updated_at` stamps the way the SQL defaults
/// would provide them.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, IndexMap<String, Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in a table (0 when the table is missing).
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.read().unwrap().contains_key(table)
    }

    fn stamp(record: &mut Record, update: bool) {
        let now = Value::String(Utc::now().to_rfc3339());
        if !update && !record.contains("created_at") {
            record.insert("created_at", now.clone());
        }
        record.insert("updated_at", now);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn table_exists(&self, table: &str) -> StoreResult<bool> {
        Ok(self.has_table(table))
    }

    async fn execute_ddl(&self, sql: &str) -> StoreResult<()> {
        // The only DDL this store understands is table creation.
        let rest = sql
            .trim()
            .strip_prefix("CREATE TABLE ")
            .ok_or_else(|| StoreError::new(format!("unsupported DDL: {sql}")))?;
        let table = rest
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| StoreError::new("missing table name in DDL"))?;
        self.tables
            .write()
            .unwrap()
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    async fn find_by_id(&self, table: &str, id: &str) -> StoreResult<Option<Record>> {
        let tables = self.tables.read().unwrap();
        let rows = tables
            .get(table)
            .ok_or_else(|| StoreError::new(format!("table {table} does not exist")))?;
        Ok(rows.get(id).cloned())
    }

    async fn find_by_columns(
        &self,
        table: &str,
        filters: &[(String, Value)],
    ) -> StoreResult<Vec<Record>> {
        let tables = self.tables.read().unwrap();
        let rows = tables
            .get(table)
            .ok_or_else(|| StoreError::new(format!("table {table} does not exist")))?;
        Ok(rows
            .values()
            .filter(|row| {
                filters
                    .iter()
                    .all(|(column, value)| row.get(column) == Some(value))
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, table: &str, record: &Record) -> StoreResult<Record> {
        let id = record
            .id()
            .ok_or_else(|| StoreError::new("insert requires an id"))?
            .to_string();
        let mut tables = self.tables.write().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::new(format!("table {table} does not exist")))?;
        if rows.contains_key(&id) {
            return Err(StoreError::new(format!("duplicate id {id} in {table}")));
        }
        let mut row = record.clone();
        Self::stamp(&mut row, false);
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, record: &Record) -> StoreResult<Record> {
        let mut tables = self.tables.write().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::new(format!("table {table} does not exist")))?;
        let row = rows
            .get_mut(id)
            .ok_or_else(|| StoreError::new(format!("no row {id} in {table}")))?;
        for (column, value) in record.iter() {
            row.insert(column.clone(), value.clone());
        }
        Self::stamp(row, true);
        Ok(row.clone())
    }

    async fn update_by_columns(
        &self,
        table: &str,
        filters: &[(String, Value)],
        record: &Record,
    ) -> StoreResult<Vec<Record>> {
        let mut tables = self.tables.write().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::new(format!("table {table} does not exist")))?;
        let mut updated = Vec::new();
        for row in rows.values_mut() {
            let matches = filters
                .iter()
                .all(|(column, value)| row.get(column) == Some(value));
            if matches {
                for (column, value) in record.iter() {
                    row.insert(column.clone(), value.clone());
                }
                Self::stamp(row, true);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_object(value).unwrap()
    }

    #[tokio::test]
    async fn test_ddl_creates_table() {
        let store = MemoryStore::new();
        assert!(!store.table_exists("lenders").await.unwrap());
        store
            .execute_ddl("CREATE TABLE lenders (\n    id TEXT PRIMARY KEY\n);")
            .await
            .unwrap();
        assert!(store.table_exists("lenders").await.unwrap());
    }

    #[tokio::test]
    async fn test_ddl_rejects_non_create() {
        let store = MemoryStore::new();
        assert!(store.execute_ddl("DROP TABLE lenders;").await.is_err());
    }

    #[tokio::test]
    async fn test_insert_stamps_timestamps() {
        let store = MemoryStore::new();
        store.execute_ddl("CREATE TABLE t (id TEXT);").await.unwrap();
        let row = store
            .insert("t", &record(json!({"id": "1", "name": "x"})))
            .await
            .unwrap();
        assert!(row.contains("created_at"));
        assert!(row.contains("updated_at"));
    }

    #[tokio::test]
    async fn test_update_merges_columns() {
        let store = MemoryStore::new();
        store.execute_ddl("CREATE TABLE t (id TEXT);").await.unwrap();
        store
            .insert("t", &record(json!({"id": "1", "name": "x", "phone": "7"})))
            .await
            .unwrap();
        let row = store
            .update("t", "1", &record(json!({"id": "1", "name": "y"})))
            .await
            .unwrap();
        assert_eq!(row.get("name"), Some(&json!("y")));
        assert_eq!(row.get("phone"), Some(&json!("7")));
    }

    #[tokio::test]
    async fn test_find_by_columns_matches_all_filters() {
        let store = MemoryStore::new();
        store.execute_ddl("CREATE TABLE t (id TEXT);").await.unwrap();
        store
            .insert("t", &record(json!({"id": "1", "city": "Pune", "name": "a"})))
            .await
            .unwrap();
        store
            .insert("t", &record(json!({"id": "2", "city": "Pune", "name": "b"})))
            .await
            .unwrap();
        let matches = store
            .find_by_columns(
                "t",
                &[
                    ("city".to_string(), json!("Pune")),
                    ("name".to_string(), json!("b")),
                ],
            )
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].get("id"), Some(&json!("2")));
    }
}
