//! Classification engine: resolve a request to a use-case bundle.
//!
//! One state machine per request: classify against known keywords,
//! load the matching bundle, or — on the sentinel — generate a new
//! bundle and build its schema dynamically. The only non-failure
//! terminal state hands a concrete config + schema to the pipeline.

use tracing::{info, warn};

use crate::error::{Result, SnifferError};
use crate::schema::{self, RecordSchema};
use crate::traits::analyzer::{Analyzer, ConfigProposal, NOT_FOUND_SENTINEL};
use crate::types::usecase::{SchemaRef, UseCaseConfig, UseCaseStore};
use crate::types::SniffRequest;

/// A fully resolved use case: the terminal `Found` state.
#[derive(Debug, Clone)]
pub struct ResolvedUseCase {
    pub config: UseCaseConfig,
    pub schema: RecordSchema,
    /// The extraction subject reported by classification/generation.
    pub entity: Option<String>,
    /// Bundle keywords plus request-supplied additions. Built per
    /// request; the store's base set is never mutated.
    pub search_keywords: Vec<String>,
}

/// Run the classification state machine for one request.
pub async fn resolve_use_case<A: Analyzer>(
    analyzer: &A,
    store: &UseCaseStore,
    request: &SniffRequest,
) -> Result<ResolvedUseCase> {
    let mut candidates = store.candidate_keywords();
    candidates.push(NOT_FOUND_SENTINEL.to_string());

    let classification = analyzer
        .classify(&candidates, &request.urls, &request.prompt)
        .await
        .map_err(SnifferError::at_stage("classification"))?;

    let chosen = classification.keyword.trim();
    let known = chosen.to_lowercase() != NOT_FOUND_SENTINEL.to_lowercase()
        && candidates
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(chosen));

    let (config, schema, entity) = if known {
        info!(keyword = chosen, "use case found in configuration");
        let config = store
            .resolve(chosen)
            .ok_or_else(|| SnifferError::Classification(format!("no bundle for {chosen}")))?
            .clone();
        let schema = schema_for(&config.output_schema);
        (config, schema, classification.entity)
    } else {
        info!(keyword = chosen, "use case not recognized, generating configuration");
        let proposal = analyzer
            .generate_config(&request.urls, &request.prompt)
            .await
            .map_err(SnifferError::at_stage("config generation"))?
            .filter(|p| !p.is_vacant())
            .ok_or_else(|| {
                SnifferError::Classification("config generation returned no usable proposal".into())
            })?;
        let entity = proposal.entity.clone();
        let (config, schema) = assemble_generated(store, proposal);
        (config, schema, entity)
    };

    let mut search_keywords = config.match_keywords.clone();
    for keyword in &request.extra_keywords {
        if !search_keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            search_keywords.push(keyword.clone());
        }
    }

    Ok(ResolvedUseCase {
        config,
        schema,
        entity,
        search_keywords,
    })
}

/// Resolve a schema reference, falling back to the generic contact
/// schema when a named id is unrecognized.
fn schema_for(reference: &SchemaRef) -> RecordSchema {
    match reference {
        SchemaRef::Inline(schema) => schema.clone(),
        SchemaRef::Named(id) => schema::resolve(id).unwrap_or_else(|| {
            warn!(schema_id = %id, "unknown schema id, falling back to contact schema");
            schema::contact()
        }),
    }
}

/// Assemble a bundle from a generation proposal.
///
/// Gaps fall back to the default bundle: an unbuildable field list
/// becomes the contact schema, empty prompt strings take the default
/// bundle's templates.
fn assemble_generated(
    store: &UseCaseStore,
    proposal: ConfigProposal,
) -> (UseCaseConfig, RecordSchema) {
    let schema = RecordSchema::from_columns(
        proposal.usecase.as_deref().unwrap_or("generated"),
        &proposal.output_columns,
    )
    .unwrap_or_else(|| {
        warn!("proposed field list unusable, falling back to contact schema");
        schema::contact()
    });

    let defaults = store.default_config();
    let default_table = defaults
        .map(|d| d.table_name.clone())
        .unwrap_or_else(|| "extractions".to_string());
    let default_system = defaults
        .map(|d| d.scraper_system_message.clone())
        .unwrap_or_default();
    let default_scraper = defaults
        .map(|d| d.scraper_prompt.clone())
        .unwrap_or_default();
    let default_refinement = defaults
        .map(|d| d.refinement_prompt.clone())
        .unwrap_or_default();
    let filled = |proposed: Option<String>| proposed.filter(|p| !p.trim().is_empty());

    let config = UseCaseConfig {
        keyword: proposal.usecase.unwrap_or_else(|| "generated".to_string()),
        match_keywords: proposal.keywords,
        unique_key: proposal.unique_key.unwrap_or_else(|| "id".to_string()),
        table_name: filled(proposal.table_name).unwrap_or(default_table),
        update_if_exists: true,
        output_schema: SchemaRef::Inline(schema.clone()),
        scraper_system_message: filled(proposal.scraper_system_message)
            .unwrap_or(default_system),
        scraper_prompt: filled(proposal.scraper_prompt).unwrap_or(default_scraper),
        refinement_prompt: filled(proposal.refinement_prompt).unwrap_or(default_refinement),
    };

    (config, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;
    use crate::testing::MockAnalyzer;

    fn request() -> SniffRequest {
        SniffRequest::new(["https://example-bank.test/home-loans"]).with_sniffer_extraction()
    }

    #[tokio::test]
    async fn test_known_keyword_loads_bundle() {
        let analyzer = MockAnalyzer::new().with_classification("lenders", Some("Example Bank"));
        let resolved = resolve_use_case(&analyzer, &UseCaseStore::builtin(), &request())
            .await
            .unwrap();
        assert_eq!(resolved.config.table_name, "lenders");
        assert_eq!(resolved.schema.name, schema::LENDER_TERMS);
        assert_eq!(resolved.entity.as_deref(), Some("Example Bank"));
    }

    #[tokio::test]
    async fn test_keyword_match_is_case_insensitive() {
        let analyzer = MockAnalyzer::new().with_classification("LENDERS", None);
        let resolved = resolve_use_case(&analyzer, &UseCaseStore::builtin(), &request())
            .await
            .unwrap();
        assert_eq!(resolved.config.keyword, "lenders");
    }

    #[tokio::test]
    async fn test_sentinel_generates_bundle() {
        let proposal = ConfigProposal {
            usecase: Some("restaurants".into()),
            entity: Some("Quick Bites".into()),
            keywords: vec!["menu".into()],
            table_name: Some("restaurants".into()),
            unique_key: Some("name".into()),
            output_columns: vec![
                ColumnSpec::new("name", "str"),
                ColumnSpec::new("cuisine", "mystery"),
            ],
            ..Default::default()
        };
        let analyzer = MockAnalyzer::new()
            .with_classification(NOT_FOUND_SENTINEL, None)
            .with_proposal(proposal);
        let resolved = resolve_use_case(&analyzer, &UseCaseStore::builtin(), &request())
            .await
            .unwrap();
        assert_eq!(resolved.config.table_name, "restaurants");
        assert_eq!(resolved.schema.fields.len(), 2);
        // Empty proposed prompts take the default bundle's templates.
        assert!(!resolved.config.scraper_prompt.is_empty());
    }

    #[tokio::test]
    async fn test_empty_proposed_fields_fall_back_to_contact() {
        let proposal = ConfigProposal {
            usecase: Some("mystery".into()),
            table_name: Some("mystery".into()),
            ..Default::default()
        };
        let analyzer = MockAnalyzer::new()
            .with_classification(NOT_FOUND_SENTINEL, None)
            .with_proposal(proposal);
        let resolved = resolve_use_case(&analyzer, &UseCaseStore::builtin(), &request())
            .await
            .unwrap();
        assert_eq!(resolved.schema.name, schema::CONTACT);
    }

    #[tokio::test]
    async fn test_no_proposal_is_a_classification_failure() {
        let analyzer = MockAnalyzer::new()
            .with_classification(NOT_FOUND_SENTINEL, None)
            .with_no_proposal();
        let err = resolve_use_case(&analyzer, &UseCaseStore::builtin(), &request())
            .await
            .unwrap_err();
        assert!(matches!(err, SnifferError::Classification(_)));
    }

    #[tokio::test]
    async fn test_request_keywords_extend_without_mutating_store() {
        let store = UseCaseStore::builtin();
        let base_len = store.resolve("lenders").unwrap().match_keywords.len();
        let analyzer = MockAnalyzer::new().with_classification("lenders", None);
        let resolved = resolve_use_case(
            &analyzer,
            &store,
            &request().with_extra_keywords(["prepayment", "ltv"]),
        )
        .await
        .unwrap();
        // "ltv" already exists in the base set, "prepayment" is new.
        assert_eq!(resolved.search_keywords.len(), base_len + 1);
        assert_eq!(store.resolve("lenders").unwrap().match_keywords.len(), base_len);
    }
}
