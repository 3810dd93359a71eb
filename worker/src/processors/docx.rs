//! DOCX text extraction.
//!
//! A `.docx` file is a zip archive of XML parts. Text is pulled from the
//! `<w:t>` runs of the main document part, with paragraph boundaries kept
//! as newlines; header and footer parts are appended the same way. Table
//! cell text lives in ordinary runs and comes along for free.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{ExtractError, ExtractInput, ProcessingLimits, TextProcessor};

pub struct DocxProcessor {
    limits: ProcessingLimits,
}

impl DocxProcessor {
    pub fn new(limits: ProcessingLimits) -> Self {
        Self { limits }
    }

    fn validate(&self, data: &[u8]) -> Result<(), ExtractError> {
        if !data.starts_with(b"PK") {
            return Err(ExtractError::Validation("Invalid DOCX file format".into()));
        }
        if data.len() > self.limits.max_docx_size_bytes {
            return Err(ExtractError::Validation(format!(
                "DOCX file is too large (max {}MB)",
                self.limits.max_docx_size_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }

    /// Collects the text content of one WordprocessingML part.
    fn extract_part(xml: &str) -> Result<String, ExtractError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut in_text_run = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text_run = true,
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"t" => in_text_run = false,
                    // Paragraph and row ends become line breaks.
                    b"p" | b"tr" => {
                        lines.push(std::mem::take(&mut current));
                    }
                    _ => {}
                },
                Ok(Event::Text(t)) if in_text_run => {
                    let decoded = t
                        .unescape()
                        .map_err(|e| ExtractError::Extraction(format!("bad XML text: {e}")))?;
                    current.push_str(&decoded);
                }
                // Tab and explicit break elements inside runs.
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"tab" => current.push('\t'),
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"br" => current.push('\n'),
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(ExtractError::Extraction(format!(
                        "DOCX XML parsing failed: {e}"
                    )))
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }

        Ok(lines
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn extract_all(data: &[u8]) -> Result<String, ExtractError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|e| ExtractError::Extraction(format!("not a zip archive: {e}")))?;

        // Main document first, then headers and footers in archive order.
        let mut part_names = vec!["word/document.xml".to_string()];
        for name in archive.file_names() {
            if name.starts_with("word/header") || name.starts_with("word/footer") {
                part_names.push(name.to_string());
            }
        }

        let mut sections = Vec::new();
        for name in part_names {
            let mut xml = String::new();
            match archive.by_name(&name) {
                Ok(mut part) => {
                    part.read_to_string(&mut xml).map_err(|e| {
                        ExtractError::Extraction(format!("failed to read {name}: {e}"))
                    })?;
                }
                Err(zip::result::ZipError::FileNotFound) if name == "word/document.xml" => {
                    return Err(ExtractError::Extraction(
                        "missing word/document.xml".into(),
                    ));
                }
                Err(_) => continue,
            }
            let text = Self::extract_part(&xml)?;
            if !text.is_empty() {
                sections.push(text);
            }
        }
        Ok(sections.join("\n"))
    }
}

#[async_trait]
impl TextProcessor for DocxProcessor {
    async fn process(&self, input: ExtractInput) -> Result<String, ExtractError> {
        let data = input.into_bytes()?;
        self.validate(&data)?;

        let text = tokio::task::spawn_blocking(move || Self::extract_all(&data))
            .await
            .map_err(|e| ExtractError::Extraction(format!("extraction task failed: {e}")))??;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_with(document_xml: &str, extra: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            for (name, content) in extra {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[tokio::test]
    async fn extracts_paragraphs_tables_and_headers() {
        let document = r#"<?xml version="1.0"?>
            <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body>
                <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
                <w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell text</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
              </w:body>
            </w:document>"#;
        let header = r#"<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:p><w:r><w:t>Header text</w:t></w:r></w:p>
            </w:hdr>"#;
        let bytes = docx_with(document, &[("word/header1.xml", header)]);

        let text = DocxProcessor::new(ProcessingLimits::default())
            .process(ExtractInput::Bytes(Bytes::from(bytes)))
            .await
            .unwrap();

        assert!(text.contains("First paragraph."));
        assert!(text.contains("Cell text"));
        assert!(text.contains("Header text"));
    }

    #[tokio::test]
    async fn rejects_non_zip_bytes() {
        let err = DocxProcessor::new(ProcessingLimits::default())
            .process(ExtractInput::Bytes(Bytes::from_static(b"plain text, no PK magic")))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Validation(_)));
    }

    #[tokio::test]
    async fn zip_without_document_part_is_an_extraction_error() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("unrelated.txt", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"nothing here").unwrap();
            writer.finish().unwrap();
        }
        let err = DocxProcessor::new(ProcessingLimits::default())
            .process(ExtractInput::Bytes(Bytes::from(buffer.into_inner())))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("document.xml"));
    }
}
