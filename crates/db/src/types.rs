//! Column enums stored as lowercase text.

use std::io::Write;

use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    serialize::{self, IsNull, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a document or source as it moves through the
/// indexing pipeline. The happy path is `pending -> processing -> indexed`;
/// `failed` can be reached from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Indexed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Indexed => "indexed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl ToSql<Text, Pg> for ProcessingStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for ProcessingStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"pending" => Ok(ProcessingStatus::Pending),
            b"processing" => Ok(ProcessingStatus::Processing),
            b"indexed" => Ok(ProcessingStatus::Indexed),
            b"failed" => Ok(ProcessingStatus::Failed),
            other => Err(format!(
                "Unrecognized processing status: {}",
                String::from_utf8_lossy(other)
            )
            .into()),
        }
    }
}

/// Kind of a citable source attached to a notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Links to an uploaded [`Document`](crate::models::Document).
    Document,
    /// Web pages and articles.
    Url,
    /// Video files or links. Not yet indexed.
    Video,
    /// Image files. Not yet indexed.
    Image,
    /// Raw text pasted by the user.
    Text,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Document => "document",
            SourceType::Url => "url",
            SourceType::Video => "video",
            SourceType::Image => "image",
            SourceType::Text => "text",
        }
    }
}

impl ToSql<Text, Pg> for SourceType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for SourceType {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"document" => Ok(SourceType::Document),
            b"url" => Ok(SourceType::Url),
            b"video" => Ok(SourceType::Video),
            b"image" => Ok(SourceType::Image),
            b"text" => Ok(SourceType::Text),
            other => Err(format!(
                "Unrecognized source type: {}",
                String::from_utf8_lossy(other)
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&ProcessingStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let back: ProcessingStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProcessingStatus::Processing);
    }

    #[test]
    fn source_type_names_are_lowercase() {
        assert_eq!(SourceType::Document.as_str(), "document");
        assert_eq!(SourceType::Url.as_str(), "url");
        assert_eq!(SourceType::Text.as_str(), "text");
    }
}
