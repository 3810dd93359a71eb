//! Plain-text extraction: decode, normalize, clean.

use async_trait::async_trait;
use tracing::info;

use super::{ExtractError, ExtractInput, ProcessingLimits, TextProcessor};

pub struct TxtProcessor {
    limits: ProcessingLimits,
}

impl TxtProcessor {
    pub fn new(limits: ProcessingLimits) -> Self {
        Self { limits }
    }

    fn validate(&self, data: &[u8]) -> Result<(), ExtractError> {
        if data.len() > self.limits.max_txt_size_bytes {
            return Err(ExtractError::Validation(format!(
                "Text file is too large (max {}MB)",
                self.limits.max_txt_size_bytes / (1024 * 1024)
            )));
        }
        let null_count = data.iter().filter(|b| **b == 0).count();
        if (null_count as f64) > (data.len() as f64) * self.limits.max_binary_null_ratio {
            return Err(ExtractError::Validation(
                "File appears to be binary, not text".into(),
            ));
        }
        Ok(())
    }

    /// UTF-8 first; on failure fall back to Latin-1, which maps every byte
    /// to its code point and therefore always succeeds.
    fn decode(data: &[u8]) -> String {
        match std::str::from_utf8(data) {
            Ok(text) => text.to_string(),
            Err(_) => {
                info!("Decoded text file using latin-1 fallback");
                data.iter().map(|b| *b as char).collect()
            }
        }
    }

    /// Strips control characters (except tab/newline), normalizes line
    /// endings, trims lines and collapses blank ones.
    fn clean(text: &str) -> String {
        let filtered: String = text
            .chars()
            .filter(|c| *c >= ' ' || matches!(c, '\n' | '\r' | '\t'))
            .collect();
        let normalized = filtered.replace("\r\n", "\n").replace('\r', "\n");
        normalized
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl TextProcessor for TxtProcessor {
    async fn process(&self, input: ExtractInput) -> Result<String, ExtractError> {
        let data = input.into_bytes()?;
        self.validate(&data)?;
        Ok(Self::clean(&Self::decode(&data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn processor() -> TxtProcessor {
        TxtProcessor::new(ProcessingLimits::default())
    }

    #[tokio::test]
    async fn utf8_text_is_cleaned_and_normalized() {
        let raw = b"first line\r\n\r\n  second line  \rthird\x00line\x07!\n";
        let text = processor()
            .process(ExtractInput::Bytes(Bytes::from_static(raw)))
            .await
            .unwrap();
        assert_eq!(text, "first line\nsecond line\nthirdline!");
    }

    #[tokio::test]
    async fn non_utf8_bytes_fall_back_to_latin1() {
        // 0xE9 is 'é' in Latin-1 and invalid as a standalone UTF-8 byte.
        let raw = vec![b'c', b'a', b'f', 0xE9];
        let text = processor()
            .process(ExtractInput::Bytes(Bytes::from(raw)))
            .await
            .unwrap();
        assert_eq!(text, "café");
    }

    #[tokio::test]
    async fn mostly_null_content_is_rejected_as_binary() {
        let mut raw = vec![0u8; 80];
        raw.extend_from_slice(b"some text at the end");
        let err = processor()
            .process(ExtractInput::Bytes(Bytes::from(raw)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("binary"));
    }

    #[tokio::test]
    async fn whitespace_only_files_clean_to_empty_output() {
        let text = processor()
            .process(ExtractInput::Bytes(Bytes::from_static(b"  \n \r\n \t \n")))
            .await
            .unwrap();
        assert!(text.is_empty());
    }
}
