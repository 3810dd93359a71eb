//! Vector index gateway.
//!
//! Embedding points are addressed by a *logical id*: the document id for
//! file-backed sources, the source id for url/text sources. Each chunk of a
//! logical id becomes one point whose numeric id is a deterministic hash of
//! `"{logical_id}_{chunk_index}"`, so re-indexing the same entity
//! overwrites its points in place and repeated processing of one event
//! converges to the same index state.

pub mod memory;
pub mod qdrant;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryVectorIndex;
pub use qdrant::QdrantIndex;

/// Default collection dimension, matching `text-embedding-3-small`.
pub const DEFAULT_DIMENSION: u64 = 1536;

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("Vector store unavailable: {0}")]
    Unavailable(String),

    #[error("Vector store error: {0}")]
    Other(String),
}

/// The id under which a chunk set is addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalId {
    Document(Uuid),
    Source(Uuid),
}

impl LogicalId {
    pub fn uuid(&self) -> Uuid {
        match self {
            LogicalId::Document(id) | LogicalId::Source(id) => *id,
        }
    }
}

/// One chunk to be indexed, with its citation metadata.
#[derive(Debug, Clone)]
pub struct ChunkData {
    pub text: String,
    pub filename: Option<String>,
    pub url: Option<String>,
    pub source_type: Option<String>,
    pub metadata: serde_json::Value,
}

/// Payload stored on (and read back from) every point.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub document_id: Option<Uuid>,
    pub source_id: Option<Uuid>,
    pub chunk_index: i64,
    pub chunk_text: String,
    pub filename: Option<String>,
    pub url: Option<String>,
    pub owner_id: Uuid,
    pub source_type: Option<String>,
    pub metadata: serde_json::Value,
}

impl ChunkRecord {
    /// The id retrieval should cite for this chunk.
    pub fn ref_id(&self) -> Option<Uuid> {
        self.document_id.or(self.source_id)
    }
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub point_id: u64,
    pub score: f32,
    pub record: ChunkRecord,
}

/// Disjunctive id filter, optionally narrowed to one owner.
///
/// `any_ids` matches points whose payload `document_id` *or* `source_id`
/// equals any of the given ids, so callers never need to know which kind of
/// logical id a selection entry is.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub any_ids: Vec<Uuid>,
    pub owner_id: Option<Uuid>,
}

impl SearchFilter {
    pub fn for_owner(owner_id: Uuid) -> Self {
        Self {
            any_ids: Vec::new(),
            owner_id: Some(owner_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.any_ids.is_empty() && self.owner_id.is_none()
    }
}

/// Summary used by health endpoints.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: Option<u64>,
    pub status: String,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Creates the collection if missing (cosine distance, configured
    /// dimension). Runs at startup.
    async fn ensure_collection(&self) -> Result<(), VectorStoreError>;

    /// Replaces the chunk set of `logical_id` with the given chunks.
    /// `embeddings` must be parallel to `chunks`.
    async fn upsert_chunks(
        &self,
        logical_id: LogicalId,
        owner_id: Uuid,
        chunks: Vec<ChunkData>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<(), VectorStoreError>;

    /// Deletes every point whose payload matches `document_id = id` or
    /// `source_id = id`.
    async fn delete_by_logical_id(&self, id: Uuid) -> Result<(), VectorStoreError>;

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: f32,
        filter: SearchFilter,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError>;

    async fn collection_info(&self) -> Result<CollectionInfo, VectorStoreError>;
}

/// Deterministic 63-bit point id for `"{logical_id}_{index}"`.
///
/// FNV-1a over the formatted string, masked to the positive i64 range so
/// the id is valid for backends that store point ids as signed integers.
pub fn point_id(logical_id: Uuid, chunk_index: usize) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let key = format!("{logical_id}_{chunk_index}");
    let mut hash = FNV_OFFSET;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash & 0x7fff_ffff_ffff_ffff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_ids_are_deterministic_and_positive() {
        let id = Uuid::parse_str("01890a5d-ac96-774b-bcce-b302099a8057").unwrap();
        let first = point_id(id, 0);
        assert_eq!(first, point_id(id, 0));
        assert_ne!(first, point_id(id, 1));
        assert!(first <= i64::MAX as u64);
    }

    #[test]
    fn point_ids_differ_across_logical_ids() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_ne!(point_id(a, 0), point_id(b, 0));
    }
}
