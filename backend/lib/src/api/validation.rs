//! Input validation helpers for the upload surface.

use crate::error::{Error, Result};

/// Lowercased extension of `filename`, empty when there is none.
pub fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// MIME types accepted in addition to the extension allowlist.
const KNOWN_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
    "text/plain",
    "text/markdown",
    "text/csv",
];

/// Allowlist check over extension and declared MIME type.
pub fn validate_file_type(
    filename: &str,
    mime_type: Option<&str>,
    allowed_extensions: &[String],
) -> Result<()> {
    let extension = extension_of(filename);
    let extension_ok = !extension.is_empty()
        && allowed_extensions.iter().any(|allowed| *allowed == extension);
    let mime_ok = mime_type.map_or(false, |m| KNOWN_MIME_TYPES.contains(&m));

    if extension_ok || mime_ok {
        Ok(())
    } else {
        Err(Error::BadRequest(format!(
            "File type not allowed: {filename} (allowed: {})",
            allowed_extensions.join(", ")
        )))
    }
}

/// `1536` -> `"1.5KB"`, matching the style used in error messages.
pub fn bytes_to_human_readable(bytes: usize) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.1}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1}TB")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["pdf".to_string(), "txt".to_string(), "docx".to_string()]
    }

    #[test]
    fn extension_parsing_handles_edge_cases() {
        assert_eq!(extension_of("notes.txt"), "txt");
        assert_eq!(extension_of("archive.tar.GZ"), "gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".bashrc"), "");
    }

    #[test]
    fn allowlist_accepts_extension_or_mime() {
        assert!(validate_file_type("a.pdf", None, &allowed()).is_ok());
        assert!(validate_file_type("a.bin", Some("text/plain"), &allowed()).is_ok());
        assert!(validate_file_type("a.exe", Some("application/x-dosexec"), &allowed()).is_err());
        assert!(validate_file_type("noext", None, &allowed()).is_err());
    }

    #[test]
    fn human_readable_sizes() {
        assert_eq!(bytes_to_human_readable(12), "12.0B");
        assert_eq!(bytes_to_human_readable(10 * 1024 * 1024), "10.0MB");
    }
}
