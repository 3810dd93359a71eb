//! In-memory index with real cosine scoring, for tests and local runs.

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    point_id, ChunkData, ChunkRecord, CollectionInfo, LogicalId, ScoredChunk, SearchFilter,
    VectorIndex, VectorStoreError,
};

struct StoredPoint {
    id: u64,
    vector: Vec<f32>,
    record: ChunkRecord,
}

#[derive(Default)]
pub struct InMemoryVectorIndex {
    points: RwLock<Vec<StoredPoint>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_count(&self) -> usize {
        self.points.read().len()
    }

    /// Chunk records for one logical id, ordered by chunk index. Test
    /// helper for asserting idempotent re-indexing.
    pub fn records_for(&self, id: Uuid) -> Vec<ChunkRecord> {
        let points = self.points.read();
        let mut records: Vec<ChunkRecord> = points
            .iter()
            .filter(|p| p.record.document_id == Some(id) || p.record.source_id == Some(id))
            .map(|p| p.record.clone())
            .collect();
        records.sort_by_key(|r| r.chunk_index);
        records
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }

    fn matches(record: &ChunkRecord, filter: &SearchFilter) -> bool {
        if let Some(owner) = filter.owner_id {
            if record.owner_id != owner {
                return false;
            }
        }
        if filter.any_ids.is_empty() {
            return true;
        }
        filter.any_ids.iter().any(|id| {
            record.document_id == Some(*id) || record.source_id == Some(*id)
        })
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn upsert_chunks(
        &self,
        logical_id: LogicalId,
        owner_id: Uuid,
        chunks: Vec<ChunkData>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<(), VectorStoreError> {
        if chunks.len() != embeddings.len() {
            return Err(VectorStoreError::Other(format!(
                "chunk/embedding count mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        self.delete_by_logical_id(logical_id.uuid()).await?;

        let mut points = self.points.write();
        for (index, (chunk, vector)) in chunks.into_iter().zip(embeddings).enumerate() {
            let (document_id, source_id) = match logical_id {
                LogicalId::Document(id) => (Some(id), None),
                LogicalId::Source(id) => (None, Some(id)),
            };
            points.push(StoredPoint {
                id: point_id(logical_id.uuid(), index),
                vector,
                record: ChunkRecord {
                    document_id,
                    source_id,
                    chunk_index: index as i64,
                    chunk_text: chunk.text,
                    filename: chunk.filename,
                    url: chunk.url,
                    owner_id,
                    source_type: chunk.source_type,
                    metadata: chunk.metadata,
                },
            });
        }
        Ok(())
    }

    async fn delete_by_logical_id(&self, id: Uuid) -> Result<(), VectorStoreError> {
        self.points.write().retain(|p| {
            p.record.document_id != Some(id) && p.record.source_id != Some(id)
        });
        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: f32,
        filter: SearchFilter,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        let points = self.points.read();
        let mut hits: Vec<ScoredChunk> = points
            .iter()
            .filter(|p| Self::matches(&p.record, &filter))
            .map(|p| ScoredChunk {
                point_id: p.id,
                score: Self::cosine(&vector, &p.vector),
                record: p.record.clone(),
            })
            .filter(|hit| hit.score >= score_threshold)
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn collection_info(&self) -> Result<CollectionInfo, VectorStoreError> {
        Ok(CollectionInfo {
            name: "memory".into(),
            points_count: Some(self.points.read().len() as u64),
            status: "Green".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> ChunkData {
        ChunkData {
            text: text.to_string(),
            filename: None,
            url: None,
            source_type: None,
            metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn reindexing_replaces_the_chunk_set() {
        let index = InMemoryVectorIndex::new();
        let id = Uuid::now_v7();
        let owner = Uuid::now_v7();

        index
            .upsert_chunks(
                LogicalId::Document(id),
                owner,
                vec![chunk("a"), chunk("b"), chunk("c")],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            )
            .await
            .unwrap();
        assert_eq!(index.point_count(), 3);

        // Re-index with fewer chunks: no stale tail may survive.
        index
            .upsert_chunks(
                LogicalId::Document(id),
                owner,
                vec![chunk("a2")],
                vec![vec![1.0, 0.0]],
            )
            .await
            .unwrap();
        let records = index.records_for(id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chunk_text, "a2");
    }

    #[tokio::test]
    async fn search_applies_owner_and_id_filters() {
        let index = InMemoryVectorIndex::new();
        let owner_a = Uuid::now_v7();
        let owner_b = Uuid::now_v7();
        let doc = Uuid::now_v7();
        let src = Uuid::now_v7();

        index
            .upsert_chunks(
                LogicalId::Document(doc),
                owner_a,
                vec![chunk("alpha")],
                vec![vec![1.0, 0.0]],
            )
            .await
            .unwrap();
        index
            .upsert_chunks(
                LogicalId::Source(src),
                owner_b,
                vec![chunk("beta")],
                vec![vec![1.0, 0.1]],
            )
            .await
            .unwrap();

        // Owner filter hides the other user's points entirely.
        let hits = index
            .search(vec![1.0, 0.0], 10, 0.0, SearchFilter::for_owner(owner_a))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.owner_id, owner_a);

        // Id filter matches source ids as well as document ids.
        let hits = index
            .search(
                vec![1.0, 0.0],
                10,
                0.0,
                SearchFilter {
                    any_ids: vec![src],
                    owner_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.source_id, Some(src));
    }

    #[tokio::test]
    async fn search_respects_threshold_and_limit() {
        let index = InMemoryVectorIndex::new();
        let owner = Uuid::now_v7();
        let id = Uuid::now_v7();
        index
            .upsert_chunks(
                LogicalId::Document(id),
                owner,
                vec![chunk("near"), chunk("far")],
                vec![vec![1.0, 0.0], vec![-1.0, 0.0]],
            )
            .await
            .unwrap();

        let hits = index
            .search(vec![1.0, 0.0], 10, 0.5, SearchFilter::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.chunk_text, "near");
    }
}
