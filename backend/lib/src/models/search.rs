use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_limit() -> u64 {
    10
}

fn default_score_threshold() -> f32 {
    0.7
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    /// The logical id the chunk is addressed under (document or source id).
    pub document_id: Option<Uuid>,
    pub filename: String,
    pub score: f32,
    pub chunk_text: String,
    pub chunk_index: i64,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QdrantHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_count: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingsHealth {
    pub available: bool,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct SearchHealth {
    pub status: String,
    pub qdrant: QdrantHealth,
    pub openai: EmbeddingsHealth,
}
