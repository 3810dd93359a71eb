//! Text extraction processors.
//!
//! A factory maps `(source_type, mime_type)` to the processor that knows
//! how to turn raw input into plain text. Every processor validates its
//! input (magic bytes, size caps, binary-content heuristics) before
//! extracting; all failures surface as a typed [`ExtractError`].

pub mod docx;
pub mod pdf;
pub mod txt;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use docx::DocxProcessor;
pub use pdf::PdfProcessor;
pub use txt::TxtProcessor;
pub use url::UrlProcessor;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Extraction timed out after {0} seconds")]
    Timeout(u64),
}

/// Input handed to a processor: raw bytes for file kinds, a string for
/// URL kinds.
#[derive(Debug, Clone)]
pub enum ExtractInput {
    Bytes(Bytes),
    Text(String),
}

impl ExtractInput {
    pub(crate) fn into_bytes(self) -> Result<Bytes, ExtractError> {
        match self {
            ExtractInput::Bytes(bytes) if bytes.is_empty() => {
                Err(ExtractError::Validation("Input data cannot be empty".into()))
            }
            ExtractInput::Bytes(bytes) => Ok(bytes),
            ExtractInput::Text(_) => Err(ExtractError::Validation(
                "Expected binary file data".into(),
            )),
        }
    }

    pub(crate) fn into_text(self) -> Result<String, ExtractError> {
        match self {
            ExtractInput::Text(text) if text.trim().is_empty() => {
                Err(ExtractError::Validation("Input data cannot be empty".into()))
            }
            ExtractInput::Text(text) => Ok(text),
            ExtractInput::Bytes(_) => Err(ExtractError::Validation("Expected a string".into())),
        }
    }
}

/// Size caps and heuristics shared by the processors.
#[derive(Debug, Clone)]
pub struct ProcessingLimits {
    pub max_pdf_size_bytes: usize,
    pub max_docx_size_bytes: usize,
    pub max_txt_size_bytes: usize,
    pub min_file_size_bytes: usize,
    /// A "text" file with more than this ratio of NUL bytes is treated as
    /// binary.
    pub max_binary_null_ratio: f64,
    pub url_timeout_secs: u64,
}

impl Default for ProcessingLimits {
    fn default() -> Self {
        Self {
            max_pdf_size_bytes: 10 * 1024 * 1024,
            max_docx_size_bytes: 10 * 1024 * 1024,
            max_txt_size_bytes: 10 * 1024 * 1024,
            min_file_size_bytes: 100,
            max_binary_null_ratio: 0.1,
            url_timeout_secs: 25,
        }
    }
}

#[async_trait]
pub trait TextProcessor: Send + Sync {
    /// Validates and extracts. Empty *output* is allowed (the caller
    /// decides what an empty document means); empty *input* is not.
    async fn process(&self, input: ExtractInput) -> Result<String, ExtractError>;
}

pub struct ProcessorFactory {
    limits: ProcessingLimits,
    http: reqwest::Client,
}

impl ProcessorFactory {
    pub fn new(limits: ProcessingLimits) -> Self {
        Self {
            limits,
            http: reqwest::Client::new(),
        }
    }

    /// Selects a processor for the given source type, narrowing `document`
    /// by MIME type. Unknown document MIME types fall back to plain text,
    /// which rejects binary content during validation.
    pub fn create(
        &self,
        source_type: &str,
        mime_type: Option<&str>,
    ) -> Result<Box<dyn TextProcessor>, ExtractError> {
        let kind = match source_type {
            "document" => match mime_type.unwrap_or("") {
                "application/pdf" => "pdf",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                | "application/msword" => "docx",
                _ => "txt",
            },
            other => other,
        };

        match kind {
            "pdf" => Ok(Box::new(PdfProcessor::new(self.limits.clone()))),
            "docx" => Ok(Box::new(DocxProcessor::new(self.limits.clone()))),
            "txt" => Ok(Box::new(TxtProcessor::new(self.limits.clone()))),
            "url" => Ok(Box::new(UrlProcessor::new(
                self.http.clone(),
                self.limits.clone(),
            ))),
            other => Err(ExtractError::Validation(format!(
                "Unsupported source type: {other}. Supported types: pdf, docx, txt, url"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn factory_maps_mime_types_for_documents() {
        let factory = ProcessorFactory::new(ProcessingLimits::default());
        assert!(factory.create("document", Some("application/pdf")).is_ok());
        assert!(factory.create("document", Some("text/plain")).is_ok());
        assert!(factory.create("url", None).is_ok());
        assert!(factory.create("carrier-pigeon", None).is_err());
    }

    #[tokio::test]
    async fn empty_input_is_rejected_uniformly() {
        let factory = ProcessorFactory::new(ProcessingLimits::default());
        let txt = factory.create("document", Some("text/plain")).unwrap();
        let err = txt
            .process(ExtractInput::Bytes(Bytes::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Validation(_)));
    }
}
