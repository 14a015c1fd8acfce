//! Stage C: structured re-extraction of serialized records.

use tracing::{debug, info};

use crate::error::{Result, SnifferError};
use crate::pipeline::extract::{normalize_records, unwrap_envelope};
use crate::pipeline::gapfill::OTHER_DATA_KEY;
use crate::pipeline::prompts;
use crate::schema::RecordSchema;
use crate::traits::Analyzer;
use crate::types::Record;

/// Run the refinement stage, replacing each record with the
/// structured re-extraction of its serialized form.
///
/// Provenance fields (`entity`, `source`) survive refinement: the
/// target schema does not carry them, so they are copied forward from
/// the pre-refinement record. The consumed `other_data` text is not.
pub async fn refine<A: Analyzer>(
    analyzer: &A,
    records: Vec<Record>,
    schema: &RecordSchema,
    refinement_prompt: &str,
) -> Result<Vec<Record>> {
    if records.is_empty() {
        return Err(SnifferError::EmptyExtraction { stage: "refinement" });
    }

    let template = prompts::resolve_template(refinement_prompt);
    let mut refined = Vec::with_capacity(records.len());

    for record in records {
        let serialized = record.to_prompt_lines();
        let prompt = format!("{template}\nData: {serialized}");
        debug!(fields = record.len(), "refining record");

        let response = analyzer
            .structured_completion(&prompt, schema, None)
            .await
            .map_err(SnifferError::at_stage("refinement"))?;
        let (mut replacements, _) = normalize_records(unwrap_envelope(response));
        if replacements.is_empty() {
            return Err(SnifferError::EmptyExtraction { stage: "refinement" });
        }

        for replacement in &mut replacements {
            for provenance in ["entity", "source"] {
                if !replacement.contains(provenance) {
                    if let Some(value) = record.get(provenance) {
                        replacement.insert(provenance, value.clone());
                    }
                }
            }
            replacement.remove(OTHER_DATA_KEY);
        }
        refined.append(&mut replacements);
    }

    info!(records = refined.len(), "refinement complete");
    Ok(refined)
}
