//! Typed errors for the sniffer library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can
//! match on failure kinds and map them to transport-level responses.

use thiserror::Error;

/// Errors that can terminate a sniff request.
///
/// Every request either succeeds or surfaces exactly one of these,
/// carrying a human-readable detail string. Per-record batch failures
/// are the one exception: they are aggregated into the batch summary
/// instead of raised (see [`crate::persist::upsert_batch`]).
#[derive(Debug, Error)]
pub enum SnifferError {
    /// Request rejected before any stage ran.
    #[error("invalid request: {reason}")]
    Validation { reason: String },

    /// Classification or config generation produced nothing usable.
    #[error("classification failed: {0}")]
    Classification(String),

    /// A stage produced zero records; nothing to refine or persist.
    #[error("no records produced by the {stage} stage")]
    EmptyExtraction { stage: &'static str },

    /// A collaborator call failed, wrapped with the stage it served.
    #[error("{stage} stage failed: {source}")]
    Capability {
        stage: &'static str,
        #[source]
        source: CapabilityError,
    },

    /// Table provisioning failed; no rows are written without a table.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Malformed JSON from a collaborator response.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl SnifferError {
    /// Shorthand for a validation failure.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Wrap a collaborator failure with the stage it occurred in.
    ///
    /// Intended for `map_err`:
    /// `analyzer.classify(..).await.map_err(SnifferError::at_stage("classification"))`
    pub fn at_stage(stage: &'static str) -> impl FnOnce(CapabilityError) -> Self {
        move |source| Self::Capability { stage, source }
    }

    /// HTTP-style status code for the boundary layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Persistence(_) => 500,
            _ => 400,
        }
    }
}

/// A failed call to an external capability (LLM, scraper, search).
///
/// Raised by collaborator implementations; the pipeline wraps it into
/// [`SnifferError::Capability`] with the stage that made the call.
/// The library never retries these itself.
#[derive(Debug, Error)]
#[error("{collaborator} error: {message}")]
pub struct CapabilityError {
    pub collaborator: &'static str,
    pub message: String,
}

impl CapabilityError {
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }
}

/// A failed datastore operation.
///
/// The persistence layer folds these into `error`-status outcomes
/// rather than letting them escape; only table provisioning promotes
/// them to [`SnifferError::Persistence`].
#[derive(Debug, Error)]
#[error("datastore error: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type alias for request-level operations.
pub type Result<T> = std::result::Result<T, SnifferError>;

/// Result type alias for collaborator calls.
pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// Result type alias for datastore operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SnifferError::validation("no urls").status_code(), 400);
        assert_eq!(
            SnifferError::Classification("no proposal".into()).status_code(),
            400
        );
        assert_eq!(
            SnifferError::Persistence("create table failed".into()).status_code(),
            500
        );
    }

    #[test]
    fn test_capability_wrapping_keeps_stage_and_collaborator() {
        let err = SnifferError::at_stage("refinement")(CapabilityError::new(
            "structured completion",
            "timeout",
        ));
        let text = err.to_string();
        assert!(text.contains("refinement"));
        assert!(std::error::Error::source(&err)
            .expect("capability errors carry a source")
            .to_string()
            .contains("structured completion"));
    }
}
