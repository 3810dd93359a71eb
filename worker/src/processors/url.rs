//! URL extraction: fetch the page and convert it to Markdown.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use super::{ExtractError, ExtractInput, ProcessingLimits, TextProcessor};

pub struct UrlProcessor {
    http: reqwest::Client,
    limits: ProcessingLimits,
}

impl UrlProcessor {
    pub fn new(http: reqwest::Client, limits: ProcessingLimits) -> Self {
        Self { http, limits }
    }

    /// Adds a scheme when missing (https) and validates that the result
    /// has a host.
    pub fn normalize_url(raw: &str) -> Result<String, ExtractError> {
        let mut candidate = raw.trim().to_string();
        if !candidate.starts_with("http://") && !candidate.starts_with("https://") {
            if candidate.starts_with("www.") {
                candidate = format!("https://{candidate}");
            } else {
                candidate = format!("https://www.{candidate}");
            }
        }

        let parsed = Url::parse(&candidate)
            .map_err(|e| ExtractError::Validation(format!("Invalid URL format: {e}")))?;
        if parsed.host_str().is_none() {
            return Err(ExtractError::Validation("Invalid URL format".into()));
        }
        Ok(candidate)
    }

    async fn fetch_markdown(&self, url: &str) -> Result<String, ExtractError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ExtractError::Extraction(format!("Request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(ExtractError::Extraction(format!(
                "Request failed with status {}",
                response.status()
            )));
        }
        let html = response
            .text()
            .await
            .map_err(|e| ExtractError::Extraction(format!("Failed to read response: {e}")))?;

        debug!(bytes = html.len(), "Fetched page, converting to markdown");
        htmd::convert(&html)
            .map_err(|e| ExtractError::Extraction(format!("HTML conversion failed: {e}")))
    }
}

#[async_trait]
impl TextProcessor for UrlProcessor {
    async fn process(&self, input: ExtractInput) -> Result<String, ExtractError> {
        let raw = input.into_text()?;
        let url = Self::normalize_url(&raw)?;
        info!(url = %url, "Extracting text from URL");

        let timeout = Duration::from_secs(self.limits.url_timeout_secs);
        let markdown = tokio::time::timeout(timeout, self.fetch_markdown(&url))
            .await
            .map_err(|_| ExtractError::Timeout(self.limits.url_timeout_secs))??;

        Ok(markdown.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_defaulted_to_https() {
        assert_eq!(
            UrlProcessor::normalize_url("example.com/page").unwrap(),
            "https://www.example.com/page"
        );
        assert_eq!(
            UrlProcessor::normalize_url("www.example.com").unwrap(),
            "https://www.example.com"
        );
        assert_eq!(
            UrlProcessor::normalize_url("http://example.com").unwrap(),
            "http://example.com"
        );
    }

    #[test]
    fn hostless_urls_are_rejected() {
        assert!(UrlProcessor::normalize_url("https://").is_err());
        assert!(UrlProcessor::normalize_url("not a url at all").is_err());
    }

    #[tokio::test]
    async fn byte_input_is_a_validation_error() {
        let processor = UrlProcessor::new(reqwest::Client::new(), ProcessingLimits::default());
        let err = processor
            .process(ExtractInput::Bytes(bytes::Bytes::from_static(b"x")))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Validation(_)));
    }
}
