//! The boundary request and outcome shapes.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SnifferError};

/// One scrape/classify/persist request.
///
/// Exactly one success shape and one failure shape leave the core:
/// success is [`SniffOutcome`], failure is [`SnifferError`] with an
/// HTTP-style status code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SniffRequest {
    /// Pages to extract from; the first URL's host is the request
    /// domain used for prompt placeholders and provenance tagging.
    pub urls: Vec<String>,

    /// Free-text context appended to the composed scraper prompt.
    pub prompt: String,

    /// Stage A mode: search-and-summarize about the request domain.
    pub enable_google_search: bool,

    /// Stage A mode: structured extraction over the URLs.
    pub enable_sniffer_extraction: bool,

    /// Stage B: search for fields the primary extraction left empty.
    pub enable_gap_fill_search: bool,

    /// Stage C: structured re-extraction of the serialized records.
    pub enable_refinement: bool,

    /// Request-scoped keyword additions; never written back to the
    /// use-case store.
    pub extra_keywords: Vec<String>,
}

impl SniffRequest {
    pub fn new(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(|u| u.into()).collect(),
            ..Default::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_google_search(mut self) -> Self {
        self.enable_google_search = true;
        self
    }

    pub fn with_sniffer_extraction(mut self) -> Self {
        self.enable_sniffer_extraction = true;
        self
    }

    pub fn with_gap_fill_search(mut self) -> Self {
        self.enable_gap_fill_search = true;
        self
    }

    pub fn with_refinement(mut self) -> Self {
        self.enable_refinement = true;
        self
    }

    pub fn with_extra_keywords(
        mut self,
        keywords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.extra_keywords = keywords.into_iter().map(|k| k.into()).collect();
        self
    }

    /// Precondition check, enforced before any stage or collaborator
    /// call: URLs present and at least one extraction mode selected.
    pub fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(SnifferError::validation(
                "URLs are required - provide at least one URL to scrape",
            ));
        }
        if !self.enable_google_search && !self.enable_sniffer_extraction {
            return Err(SnifferError::validation(
                "enable google search or sniffer extraction",
            ));
        }
        Ok(())
    }

    /// Host of the first URL; falls back to the raw string when the
    /// URL does not parse.
    pub fn domain(&self) -> String {
        self.urls
            .first()
            .map(|raw| {
                Url::parse(raw)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_owned))
                    .unwrap_or_else(|| raw.clone())
            })
            .unwrap_or_default()
    }
}

/// The single success shape leaving the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SniffOutcome {
    pub success: bool,
    pub message: String,
}

impl SniffOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_urls() {
        let request = SniffRequest::default().with_sniffer_extraction();
        assert!(matches!(
            request.validate(),
            Err(SnifferError::Validation { .. })
        ));
    }

    #[test]
    fn test_validate_requires_a_mode() {
        let request = SniffRequest::new(["https://example.com"]);
        assert!(matches!(
            request.validate(),
            Err(SnifferError::Validation { .. })
        ));
        assert!(request.with_google_search().validate().is_ok());
    }

    #[test]
    fn test_domain_from_first_url() {
        let request = SniffRequest::new(["https://example-bank.test/home-loans", "https://other.test"]);
        assert_eq!(request.domain(), "example-bank.test");
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: SniffRequest = serde_json::from_str(
            r#"{"urls": ["https://a.test"], "enableSnifferExtraction": true, "extraKeywords": ["rates"]}"#,
        )
        .unwrap();
        assert!(request.enable_sniffer_extraction);
        assert_eq!(request.extra_keywords, vec!["rates"]);
    }
}
