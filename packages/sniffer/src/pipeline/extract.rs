//! Stage A: primary extraction, plus the envelope-unwrapping adapter.

use serde_json::Value;
use tracing::{debug, info};

use crate::classify::ResolvedUseCase;
use crate::error::{Result, SnifferError};
use crate::pipeline::prompts;
use crate::traits::{Analyzer, Scraper, WebSearcher};
use crate::types::{Record, SniffRequest};

/// Output of the primary extraction stage.
#[derive(Debug, Clone)]
pub struct PrimaryExtraction {
    pub records: Vec<Record>,
    /// Whether the collaborator response was a single mapping. The
    /// gap-fill stage only runs over single-mapping results;
    /// list-shaped sets pass through untouched.
    pub single: bool,
}

/// Peel collaborator response envelopes: a `data` wrapper, then a
/// nested `output` wrapper. Runs immediately after each call so every
/// downstream stage consumes one canonical shape.
pub fn unwrap_envelope(value: Value) -> Value {
    let value = match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    match value {
        Value::Object(mut map) if map.contains_key("output") => {
            map.remove("output").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Normalize an unwrapped payload to a record list, remembering
/// whether it arrived as a single mapping.
pub fn normalize_records(value: Value) -> (Vec<Record>, bool) {
    match value {
        Value::Array(items) => (
            items.into_iter().filter_map(Record::from_object).collect(),
            false,
        ),
        object @ Value::Object(_) => (
            Record::from_object(object).into_iter().collect(),
            true,
        ),
        _ => (Vec::new(), false),
    }
}

/// Run the primary extraction stage.
///
/// Exactly one capability runs: search-based when the google-search
/// flag is set, otherwise structured extraction over the URLs. The
/// request validator guarantees at least one flag.
pub async fn primary_extraction<A, S, W>(
    analyzer: &A,
    scraper: &S,
    searcher: &W,
    request: &SniffRequest,
    resolved: &ResolvedUseCase,
) -> Result<PrimaryExtraction>
where
    A: Analyzer,
    S: Scraper,
    W: WebSearcher,
{
    let domain = request.domain();

    let (payload, single) = if request.enable_google_search {
        info!(domain = %domain, "primary extraction via search");
        let question = prompts::render_for_domain(prompts::SEARCH_QUESTION, &domain);
        let answer = searcher
            .answer(&question, None)
            .await
            .map_err(SnifferError::at_stage("primary extraction"))?;
        debug!(answer_len = answer.len(), "search answered, structuring");
        let structured = analyzer
            .structured_completion(
                &format!("Extract the requested fields from this research summary.\n{answer}"),
                &resolved.schema,
                None,
            )
            .await
            .map_err(SnifferError::at_stage("primary extraction"))?;
        let unwrapped = unwrap_envelope(structured);
        normalize_records(unwrapped)
    } else {
        info!(domain = %domain, urls = request.urls.len(), "primary extraction via scraper");
        let prompt = prompts::compose_scraper_prompt(
            &resolved.config.scraper_system_message,
            &resolved.config.scraper_prompt,
            &request.prompt,
            &domain,
        );
        let response = scraper
            .extract(&request.urls, &prompt, &resolved.schema.to_json_schema())
            .await
            .map_err(SnifferError::at_stage("primary extraction"))?;
        let unwrapped = unwrap_envelope(response);
        normalize_records(unwrapped)
    };

    let mut records = payload;
    if records.is_empty() {
        return Err(SnifferError::EmptyExtraction {
            stage: "primary extraction",
        });
    }

    for record in &mut records {
        record.tag(resolved.entity.as_deref(), &domain);
    }

    Ok(PrimaryExtraction { records, single })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_data_then_output() {
        let nested = json!({"data": {"output": [{"name": "a"}]}});
        assert_eq!(unwrap_envelope(nested), json!([{"name": "a"}]));

        let data_only = json!({"data": {"name": "a"}});
        assert_eq!(unwrap_envelope(data_only), json!({"name": "a"}));

        let bare = json!([{"name": "a"}]);
        assert_eq!(unwrap_envelope(bare), json!([{"name": "a"}]));
    }

    #[test]
    fn test_unwrap_keeps_plain_objects() {
        // An object without envelope keys is already the payload.
        let record = json!({"name": "a", "phone": "1"});
        assert_eq!(unwrap_envelope(record.clone()), record);
    }

    #[test]
    fn test_normalize_single_mapping() {
        let (records, single) = normalize_records(json!({"name": "a"}));
        assert_eq!(records.len(), 1);
        assert!(single);
    }

    #[test]
    fn test_normalize_list() {
        let (records, single) = normalize_records(json!([{"name": "a"}, {"name": "b"}, 7]));
        assert_eq!(records.len(), 2);
        assert!(!single);
    }

    #[test]
    fn test_normalize_scalar_is_empty() {
        let (records, single) = normalize_records(json!("free text"));
        assert!(records.is_empty());
        assert!(!single);
    }
}
