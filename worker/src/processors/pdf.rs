//! PDF text extraction.

use async_trait::async_trait;
use tracing::warn;

use super::{ExtractError, ExtractInput, ProcessingLimits, TextProcessor};

pub struct PdfProcessor {
    limits: ProcessingLimits,
}

impl PdfProcessor {
    pub fn new(limits: ProcessingLimits) -> Self {
        Self { limits }
    }

    fn validate(&self, data: &[u8]) -> Result<(), ExtractError> {
        if !data.starts_with(b"%PDF") {
            return Err(ExtractError::Validation("Invalid PDF file format".into()));
        }
        if data.len() < self.limits.min_file_size_bytes {
            return Err(ExtractError::Validation(format!(
                "PDF file appears to be too small (min {} bytes)",
                self.limits.min_file_size_bytes
            )));
        }
        if data.len() > self.limits.max_pdf_size_bytes {
            return Err(ExtractError::Validation(format!(
                "PDF file is too large (max {}MB)",
                self.limits.max_pdf_size_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TextProcessor for PdfProcessor {
    async fn process(&self, input: ExtractInput) -> Result<String, ExtractError> {
        let data = input.into_bytes()?;
        self.validate(&data)?;

        // Extraction is CPU-bound; keep it off the async executor.
        let text = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&data)
        })
        .await
        .map_err(|e| ExtractError::Extraction(format!("extraction task failed: {e}")))?
        .map_err(|e| ExtractError::Extraction(format!("PDF text extraction failed: {e}")))?;

        let text = text.trim().to_string();
        if text.is_empty() {
            // Image-only PDFs are legal; the document simply indexes with
            // zero chunks.
            warn!("No text extracted from PDF, file may be image-based");
        }
        Ok(text)
    }
}
