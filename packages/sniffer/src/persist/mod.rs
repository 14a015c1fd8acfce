//! Persistence layer: table provisioning and idempotent upserts.
//!
//! The storage primary key is always the literal `id` column; the
//! use case's semantic unique key only shapes the table (a `UNIQUE`
//! column). Records missing an `id` get a generated one before any
//! existence check. Store-level failures fold into `error`-status
//! outcomes; only table provisioning aborts the request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{Result, SnifferError};
use crate::traits::RecordStore;
use crate::types::Record;

/// Column names the create-table statement always provides itself.
const RESERVED_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Outcome status of a single upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertStatus {
    Inserted,
    Updated,
    Skipped,
    Error,
}

/// Outcome of one upsert: a status tag plus enough context for the
/// caller to log or react.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertOutcome {
    pub status: UpsertStatus,
    pub message: String,
    /// The storage key column, always `id`.
    pub key: &'static str,
    /// The key value the existence check ran against.
    pub value: String,
    /// The inserted or updated row.
    pub row: Option<Record>,
    /// The pre-existing row, when the write was skipped.
    pub existing: Option<Record>,
}

impl UpsertOutcome {
    fn new(status: UpsertStatus, message: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            key: "id",
            value: value.into(),
            row: None,
            existing: None,
        }
    }

    fn with_row(mut self, row: Record) -> Self {
        self.row = Some(row);
        self
    }

    fn with_existing(mut self, existing: Record) -> Self {
        self.existing = Some(existing);
        self
    }
}

/// Per-record entry in a batch summary.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertDetail {
    pub index: usize,
    pub status: UpsertStatus,
    pub message: String,
}

/// Accumulated result of a batch upsert. The batch is the only unit
/// of atomicity: one record's failure never aborts the rest.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total_records: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub details: Vec<UpsertDetail>,
}

/// Assign a generated `id` when the record lacks one (or carries a
/// null/empty one); returns the effective id.
pub fn assign_id(record: &mut Record) -> String {
    if let Some(id) = record.id() {
        return id.to_string();
    }
    let id = Uuid::new_v4().to_string();
    info!(id = %id, "generated id for record missing a storage key");
    record.insert("id", Value::String(id.clone()));
    id
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Generate the create-table statement for the observed columns.
///
/// Every observed column is unstructured text; `id` is the primary
/// key, the use case's unique-key column is `UNIQUE` when present and
/// distinct from `id`, and both timestamps default to now. This is
/// the generation phase of the two-phase creation: an invalid
/// identifier fails here, before anything executes.
pub fn build_create_table_sql(
    column_names: &[String],
    table_name: &str,
    unique_key: &str,
) -> Result<String> {
    if !is_valid_identifier(table_name) {
        return Err(SnifferError::Persistence(format!(
            "invalid table name: {table_name:?}"
        )));
    }

    let mut columns = vec!["id TEXT PRIMARY KEY".to_string()];
    for name in column_names {
        if RESERVED_COLUMNS.contains(&name.as_str()) {
            continue;
        }
        if !is_valid_identifier(name) {
            return Err(SnifferError::Persistence(format!(
                "invalid column name: {name:?}"
            )));
        }
        if name == unique_key {
            columns.push(format!("{name} TEXT UNIQUE"));
        } else {
            columns.push(format!("{name} TEXT"));
        }
    }
    columns.push("created_at TIMESTAMPTZ DEFAULT NOW()".to_string());
    columns.push("updated_at TIMESTAMPTZ DEFAULT NOW()".to_string());

    Ok(format!(
        "CREATE TABLE {} (\n    {}\n);",
        table_name,
        columns.join(",\n    ")
    ))
}

/// Ensure the destination table exists, creating it from the observed
/// columns when the zero-row probe finds nothing.
pub async fn ensure_table<D: RecordStore>(
    store: &D,
    column_names: &[String],
    table_name: &str,
    unique_key: &str,
) -> Result<()> {
    let exists = store
        .table_exists(table_name)
        .await
        .map_err(|e| SnifferError::Persistence(e.to_string()))?;
    if exists {
        info!(table = table_name, "table already exists");
        return Ok(());
    }

    // Two-phase: generation failures short-circuit before execution.
    let sql = build_create_table_sql(column_names, table_name, unique_key)?;
    store
        .execute_ddl(&sql)
        .await
        .map_err(|e| SnifferError::Persistence(e.to_string()))?;
    info!(table = table_name, "table created");
    Ok(())
}

/// Insert-or-update-or-skip one record, keyed on `id`.
pub async fn upsert_one<D: RecordStore>(
    store: &D,
    record: &Record,
    table_name: &str,
    update_if_exists: bool,
) -> UpsertOutcome {
    let mut record = record.clone();
    let id = assign_id(&mut record);

    let existing = match store.find_by_id(table_name, &id).await {
        Ok(existing) => existing,
        Err(e) => {
            error!(table = table_name, id = %id, "existence check failed: {e}");
            return UpsertOutcome::new(UpsertStatus::Error, e.to_string(), id);
        }
    };

    match existing {
        Some(_) if update_if_exists => match store.update(table_name, &id, &record).await {
            Ok(row) => {
                info!(table = table_name, id = %id, "record updated");
                UpsertOutcome::new(UpsertStatus::Updated, "record updated successfully", id)
                    .with_row(row)
            }
            Err(e) => UpsertOutcome::new(UpsertStatus::Error, e.to_string(), id),
        },
        Some(existing_row) => {
            info!(table = table_name, id = %id, "duplicate record skipped");
            UpsertOutcome::new(UpsertStatus::Skipped, "record already exists", id)
                .with_existing(existing_row)
        }
        None => match store.insert(table_name, &record).await {
            Ok(row) => {
                info!(table = table_name, id = %id, "record inserted");
                UpsertOutcome::new(UpsertStatus::Inserted, "new record created successfully", id)
                    .with_row(row)
            }
            Err(e) => UpsertOutcome::new(UpsertStatus::Error, e.to_string(), id),
        },
    }
}

/// Apply [`upsert_one`] to each record independently, accumulating
/// counts and one detail entry per record in input order.
pub async fn upsert_batch<D: RecordStore>(
    store: &D,
    records: &[Record],
    table_name: &str,
    update_if_exists: bool,
) -> BatchSummary {
    let mut summary = BatchSummary {
        total_records: records.len(),
        ..Default::default()
    };

    for (index, record) in records.iter().enumerate() {
        let outcome = upsert_one(store, record, table_name, update_if_exists).await;
        match outcome.status {
            UpsertStatus::Inserted => summary.inserted += 1,
            UpsertStatus::Updated => summary.updated += 1,
            UpsertStatus::Skipped => summary.skipped += 1,
            UpsertStatus::Error => summary.errors += 1,
        }
        summary.details.push(UpsertDetail {
            index,
            status: outcome.status,
            message: outcome.message,
        });
    }

    info!(
        total = summary.total_records,
        inserted = summary.inserted,
        updated = summary.updated,
        skipped = summary.skipped,
        errors = summary.errors,
        "batch upsert completed"
    );
    summary
}

/// Upsert with a multi-field uniqueness check instead of `id`.
///
/// All unique fields must be present on the record; a missing field
/// is reported as an error outcome before any query runs.
pub async fn upsert_with_keys<D: RecordStore>(
    store: &D,
    record: &Record,
    table_name: &str,
    unique_fields: &[String],
    update_if_exists: bool,
) -> UpsertOutcome {
    let missing: Vec<&String> = unique_fields
        .iter()
        .filter(|field| !record.contains(field))
        .collect();
    if !missing.is_empty() {
        return UpsertOutcome::new(
            UpsertStatus::Error,
            format!("missing unique fields: {missing:?}"),
            String::new(),
        );
    }

    let filters: Vec<(String, Value)> = unique_fields
        .iter()
        .map(|field| {
            (
                field.clone(),
                record.get(field).cloned().unwrap_or(Value::Null),
            )
        })
        .collect();
    let key_display = unique_fields.join(",");

    let matches = match store.find_by_columns(table_name, &filters).await {
        Ok(matches) => matches,
        Err(e) => return UpsertOutcome::new(UpsertStatus::Error, e.to_string(), key_display),
    };

    if let Some(existing_row) = matches.into_iter().next() {
        if update_if_exists {
            match store.update_by_columns(table_name, &filters, record).await {
                Ok(rows) => {
                    let outcome = UpsertOutcome::new(
                        UpsertStatus::Updated,
                        "record updated successfully",
                        key_display,
                    );
                    match rows.into_iter().next() {
                        Some(row) => outcome.with_row(row),
                        None => outcome,
                    }
                }
                Err(e) => UpsertOutcome::new(UpsertStatus::Error, e.to_string(), key_display),
            }
        } else {
            UpsertOutcome::new(UpsertStatus::Skipped, "record already exists", key_display)
                .with_existing(existing_row)
        }
    } else {
        let mut record = record.clone();
        assign_id(&mut record);
        match store.insert(table_name, &record).await {
            Ok(row) => UpsertOutcome::new(
                UpsertStatus::Inserted,
                "new record created successfully",
                key_display,
            )
            .with_row(row),
            Err(e) => UpsertOutcome::new(UpsertStatus::Error, e.to_string(), key_display),
        }
    }
}
