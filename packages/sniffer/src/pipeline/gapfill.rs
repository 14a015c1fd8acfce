//! Stage B: supplementary search for fields left empty by Stage A.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, SnifferError};
use crate::pipeline::extract::PrimaryExtraction;
use crate::traits::Scraper;
use crate::types::Record;

/// Key the supplementary search text is attached under.
pub const OTHER_DATA_KEY: &str = "other_data";

/// Run the gap-fill stage over the primary result.
///
/// Only single-mapping results are gap-filled; list-shaped record
/// sets pass through unchanged. Per record with empty fields, the
/// empty field names are joined into one query and the search
/// capability is called once (not once per field); its answer lands
/// under `other_data`. Records with no empty fields make no call.
pub async fn gap_fill<S: Scraper>(
    scraper: &S,
    primary: PrimaryExtraction,
) -> Result<Vec<Record>> {
    if !primary.single {
        debug!("list-shaped record set, gap-fill passes through");
        return Ok(primary.records);
    }

    let mut records = primary.records;
    for record in &mut records {
        let empty = record.empty_fields();
        if empty.is_empty() {
            debug!("no empty fields, skipping supplementary search");
            continue;
        }

        info!(fields = ?empty, "searching for empty fields");
        let query = empty.join(" ");
        let answer = scraper
            .search(&query)
            .await
            .map_err(SnifferError::at_stage("gap-fill search"))?;
        record.insert(OTHER_DATA_KEY, Value::String(answer));
    }

    Ok(records)
}
