//! Qdrant-backed index implementation.

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
        SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    },
    Payload, Qdrant,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    point_id, ChunkData, ChunkRecord, CollectionInfo, LogicalId, ScoredChunk, SearchFilter,
    VectorIndex, VectorStoreError,
};

pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: u64,
}

impl QdrantIndex {
    pub fn connect(
        url: &str,
        collection: impl Into<String>,
        dimension: u64,
    ) -> Result<Self, VectorStoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            collection: collection.into(),
            dimension,
        })
    }

    fn id_filter(id: Uuid) -> Filter {
        Filter::should([
            Condition::matches("document_id", id.to_string()),
            Condition::matches("source_id", id.to_string()),
        ])
    }

    fn search_filter(filter: &SearchFilter) -> Option<Filter> {
        if filter.is_empty() {
            return None;
        }

        let mut should = Vec::with_capacity(filter.any_ids.len() * 2);
        for id in &filter.any_ids {
            should.push(Condition::matches("document_id", id.to_string()));
            should.push(Condition::matches("source_id", id.to_string()));
        }

        let mut must = Vec::new();
        if let Some(owner) = filter.owner_id {
            must.push(Condition::matches("owner_id", owner.to_string()));
        }

        Some(Filter {
            should,
            must,
            ..Default::default()
        })
    }

    fn payload_for(
        logical_id: LogicalId,
        owner_id: Uuid,
        index: usize,
        chunk: &ChunkData,
    ) -> Payload {
        let mut payload = serde_json::json!({
            "chunk_index": index as i64,
            "chunk_text": chunk.text,
            "owner_id": owner_id.to_string(),
            "metadata": chunk.metadata,
        });
        let object = payload.as_object_mut().expect("payload is an object");
        match logical_id {
            LogicalId::Document(id) => {
                object.insert("document_id".into(), id.to_string().into());
            }
            LogicalId::Source(id) => {
                object.insert("source_id".into(), id.to_string().into());
            }
        }
        if let Some(filename) = &chunk.filename {
            object.insert("filename".into(), filename.clone().into());
        }
        if let Some(url) = &chunk.url {
            object.insert("url".into(), url.clone().into());
        }
        if let Some(source_type) = &chunk.source_type {
            object.insert("source_type".into(), source_type.clone().into());
        }

        Payload::try_from(payload).expect("payload is a JSON object")
    }

    fn record_from_payload(
        payload: std::collections::HashMap<String, qdrant_client::qdrant::Value>,
    ) -> ChunkRecord {
        let mut json = serde_json::Map::new();
        for (key, value) in payload {
            json.insert(key, value.into_json());
        }
        let get_str = |key: &str| json.get(key).and_then(|v| v.as_str().map(str::to_string));
        let get_uuid = |key: &str| {
            json.get(key)
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok())
        };

        ChunkRecord {
            document_id: get_uuid("document_id"),
            source_id: get_uuid("source_id"),
            chunk_index: json.get("chunk_index").and_then(|v| v.as_i64()).unwrap_or(0),
            chunk_text: get_str("chunk_text").unwrap_or_default(),
            filename: get_str("filename"),
            url: get_str("url"),
            owner_id: get_uuid("owner_id").unwrap_or_else(Uuid::nil),
            source_type: get_str("source_type"),
            metadata: json
                .get("metadata")
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;
        if exists {
            debug!(collection = %self.collection, "Collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(self.dimension, Distance::Cosine)),
            )
            .await
            .map_err(|e| VectorStoreError::Other(e.to_string()))?;
        info!(collection = %self.collection, dimension = self.dimension, "Created collection");
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

        // Drop the previous chunk set first so a shorter re-index leaves no
        // stale tail points behind.
        self.delete_by_logical_id(logical_id.uuid()).await?;

        let points: Vec<PointStruct> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (chunk, embedding))| {
                PointStruct::new(
                    point_id(logical_id.uuid(), index),
                    embedding,
                    Self::payload_for(logical_id, owner_id, index, chunk),
                )
            })
            .collect();

        if points.is_empty() {
            return Ok(());
        }

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| VectorStoreError::Other(e.to_string()))?;
        info!(logical_id = %logical_id.uuid(), count, "Upserted chunks");
        Ok(())
    }

    async fn delete_by_logical_id(&self, id: Uuid) -> Result<(), VectorStoreError> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection).points(Self::id_filter(id)),
            )
            .await
            .map_err(|e| VectorStoreError::Other(e.to_string()))?;
        debug!(logical_id = %id, "Deleted chunks");
        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: f32,
        filter: SearchFilter,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        let mut request =
            SearchPointsBuilder::new(&self.collection, vector, limit).with_payload(true);
        if score_threshold > 0.0 {
            request = request.score_threshold(score_threshold);
        }
        if let Some(filter) = Self::search_filter(&filter) {
            request = request.filter(filter);
        }

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| {
                let point_id = match point.id.and_then(|id| id.point_id_options) {
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => n,
                    _ => 0,
                };
                ScoredChunk {
                    point_id,
                    score: point.score,
                    record: Self::record_from_payload(point.payload),
                }
            })
            .collect())
    }

    async fn collection_info(&self) -> Result<CollectionInfo, VectorStoreError> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;
        let result = info
            .result
            .ok_or_else(|| VectorStoreError::Other("empty collection info".into()))?;
        Ok(CollectionInfo {
            name: self.collection.clone(),
            points_count: result.points_count,
            status: format!("{:?}", result.status()),
        })
    }
}
