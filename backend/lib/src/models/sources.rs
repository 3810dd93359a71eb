use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::{ProcessingStatus, Source, SourceType};

/// Typed view over `source_metadata`. The JSON shape is dictated by the
/// source type; parsing happens at the API boundary so invalid metadata
/// never reaches storage.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMetadata {
    Document { document_id: Uuid },
    Url { url: String },
    Text { content: String },
    /// Video/image sources carry free-form metadata; they are stored but
    /// not indexed.
    Other(serde_json::Value),
}

impl SourceMetadata {
    pub fn parse(
        source_type: SourceType,
        metadata: &serde_json::Value,
    ) -> Result<Self, String> {
        match source_type {
            SourceType::Document => {
                let raw = metadata
                    .get("document_id")
                    .and_then(|v| v.as_str())
                    .ok_or("Document sources must include document_id in metadata")?;
                let document_id = Uuid::parse_str(raw)
                    .map_err(|_| "document_id must be a valid UUID".to_string())?;
                Ok(SourceMetadata::Document { document_id })
            }
            SourceType::Url => {
                let url = metadata
                    .get("url")
                    .and_then(|v| v.as_str())
                    .ok_or("URL sources must include url in metadata")?;
                if url.trim().is_empty() {
                    return Err("url must not be empty".into());
                }
                Ok(SourceMetadata::Url {
                    url: url.to_string(),
                })
            }
            SourceType::Text => {
                let content = metadata
                    .get("content")
                    .and_then(|v| v.as_str())
                    .ok_or("Text sources must include content in metadata")?;
                if content.trim().is_empty() {
                    return Err("content must not be empty".into());
                }
                Ok(SourceMetadata::Text {
                    content: content.to_string(),
                })
            }
            SourceType::Video | SourceType::Image => Ok(SourceMetadata::Other(metadata.clone())),
        }
    }
}

fn default_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Deserialize)]
pub struct SourceCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub source_type: SourceType,
    #[serde(default = "default_metadata")]
    pub source_metadata: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SourceListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub source_type: Option<SourceType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourcePublic {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source_type: SourceType,
    pub source_metadata: serde_json::Value,
    pub status: ProcessingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Number of notebooks the source is attached to, to show deletion
    /// impact.
    pub notebook_count: i64,
}

impl SourcePublic {
    pub fn from_source(source: Source, notebook_count: i64) -> Self {
        Self {
            id: source.id,
            owner_id: source.owner_id,
            title: source.title,
            description: source.description,
            source_type: source.source_type,
            source_metadata: source.source_metadata,
            status: source.status,
            created_at: source.created_at,
            updated_at: source.updated_at,
            notebook_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SourcesPublic {
    pub data: Vec<SourcePublic>,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteSourceResponse {
    pub message: String,
    pub source_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_metadata_requires_a_valid_uuid() {
        let id = Uuid::now_v7();
        let ok = SourceMetadata::parse(
            SourceType::Document,
            &serde_json::json!({"document_id": id.to_string()}),
        )
        .unwrap();
        assert_eq!(ok, SourceMetadata::Document { document_id: id });

        assert!(SourceMetadata::parse(SourceType::Document, &serde_json::json!({})).is_err());
        assert!(SourceMetadata::parse(
            SourceType::Document,
            &serde_json::json!({"document_id": "nope"})
        )
        .is_err());
    }

    #[test]
    fn url_and_text_metadata_require_their_fields() {
        assert!(SourceMetadata::parse(
            SourceType::Url,
            &serde_json::json!({"url": "https://example.com"})
        )
        .is_ok());
        assert!(SourceMetadata::parse(SourceType::Url, &serde_json::json!({})).is_err());
        assert!(
            SourceMetadata::parse(SourceType::Url, &serde_json::json!({"url": "  "})).is_err()
        );

        assert!(SourceMetadata::parse(
            SourceType::Text,
            &serde_json::json!({"content": "hello"})
        )
        .is_ok());
        assert!(SourceMetadata::parse(SourceType::Text, &serde_json::json!({})).is_err());
    }

    #[test]
    fn video_metadata_is_passed_through() {
        let metadata = serde_json::json!({"codec": "h264"});
        let parsed = SourceMetadata::parse(SourceType::Video, &metadata).unwrap();
        assert_eq!(parsed, SourceMetadata::Other(metadata));
    }
}
