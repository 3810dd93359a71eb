//! The indexing pipeline: one event in, an updated index out.
//!
//! Dispatch by event shape and operation:
//! - document create/update: fetch the blob, extract, chunk, embed,
//!   upsert under the document id;
//! - url-source create/update: fetch the URL (or take inline text
//!   content), extract, chunk, embed, upsert under the source id;
//! - deletes: drop the points for the entity id.
//!
//! Effects are idempotent: point ids derive from `(logical_id,
//! chunk_index)` and every upsert replaces the full chunk set, so
//! reprocessing a redelivered event converges to the same index state.
//! Extraction that yields no text is not an error: the entity indexes with
//! zero chunks.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use nh_db::ProcessingStatus;
use nh_embeddings::Embedder;
use nh_event_bus::{ChangeEvent, DocumentEvent, EventOp, UrlSourceEvent};
use nh_object_store::ObjectStorage;
use nh_vector_store::{ChunkData, LogicalId, VectorIndex};

use crate::chunker::RecursiveCharacterChunker;
use crate::processors::{ExtractError, ExtractInput, ProcessorFactory};
use crate::status::StatusStore;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing metadata field: {0}")]
    MissingMetadata(&'static str),

    #[error("Blob fetch failed: {0}")]
    Fetch(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Embedding failed: {0}")]
    Embed(String),

    #[error("Vector upsert failed: {0}")]
    Index(String),
}

pub struct IndexingPipeline {
    object_store: Arc<dyn ObjectStorage>,
    vector_index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    status: Arc<dyn StatusStore>,
    factory: ProcessorFactory,
    chunker: RecursiveCharacterChunker,
}

impl IndexingPipeline {
    pub fn new(
        object_store: Arc<dyn ObjectStorage>,
        vector_index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        status: Arc<dyn StatusStore>,
        factory: ProcessorFactory,
        chunker: RecursiveCharacterChunker,
    ) -> Self {
        Self {
            object_store,
            vector_index,
            embedder,
            status,
            factory,
            chunker,
        }
    }

    /// Entry point for one consumed record.
    pub async fn handle_event(&self, event: ChangeEvent) -> Result<(), PipelineError> {
        match event {
            ChangeEvent::Document(event) => match event.op {
                EventOp::Create | EventOp::Update => self.process_document(&event).await,
                EventOp::Delete => self.delete_points(event.document_id).await,
            },
            ChangeEvent::UrlSource(event) => match event.op {
                EventOp::Create | EventOp::Update => self.process_url_source(&event).await,
                EventOp::Delete => self.delete_points(event.source_id).await,
            },
        }
    }

    async fn delete_points(&self, id: Uuid) -> Result<(), PipelineError> {
        self.vector_index
            .delete_by_logical_id(id)
            .await
            .map_err(|e| PipelineError::Index(e.to_string()))?;
        info!(logical_id = %id, "Deleted vector points");
        Ok(())
    }

    fn set_document_status(&self, id: Uuid, status: ProcessingStatus) -> impl std::future::Future<Output = ()> + '_ {
        let store = self.status.clone();
        async move {
            if let Err(e) = store.set_document_status(id, status).await {
                error!(document_id = %id, error = %e, "Failed to update document status");
            }
        }
    }

    fn set_source_status(&self, id: Uuid, status: ProcessingStatus) -> impl std::future::Future<Output = ()> + '_ {
        let store = self.status.clone();
        async move {
            if let Err(e) = store.set_source_status(id, status).await {
                error!(source_id = %id, error = %e, "Failed to update source status");
            }
        }
    }

    async fn process_document(&self, event: &DocumentEvent) -> Result<(), PipelineError> {
        let document_id = event.document_id;
        info!(document_id = %document_id, "Processing document event");
        self.set_document_status(document_id, ProcessingStatus::Processing)
            .await;

        let result = self.index_document(event).await;
        match &result {
            Ok(chunk_count) => {
                self.set_document_status(document_id, ProcessingStatus::Indexed)
                    .await;
                info!(document_id = %document_id, chunks = chunk_count, "Indexed document");
            }
            Err(e) => {
                error!(document_id = %document_id, error = %e, "Document processing failed");
                self.set_document_status(document_id, ProcessingStatus::Failed)
                    .await;
            }
        }
        result.map(|_| ())
    }

    async fn index_document(&self, event: &DocumentEvent) -> Result<usize, PipelineError> {
        let object_key = event
            .metadata
            .get("object_key")
            .and_then(|v| v.as_str())
            .ok_or(PipelineError::MissingMetadata("object_key"))?;
        let mime_type = event.metadata.get("mime_type").and_then(|v| v.as_str());
        let filename = event
            .metadata
            .get("filename")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let bytes = self
            .object_store
            .get(object_key)
            .await
            .map_err(|e| PipelineError::Fetch(e.to_string()))?;

        let processor = self.factory.create("document", mime_type)?;
        let text = processor.process(ExtractInput::Bytes(bytes)).await?;

        let chunk = |text: &str| ChunkData {
            text: text.to_string(),
            filename: (!filename.is_empty()).then(|| filename.to_string()),
            url: None,
            source_type: None,
            metadata: event.metadata.clone(),
        };
        self.index_chunks(
            LogicalId::Document(event.document_id),
            event.owner_id,
            &text,
            chunk,
        )
        .await
    }

    async fn process_url_source(&self, event: &UrlSourceEvent) -> Result<(), PipelineError> {
        let source_id = event.source_id;
        info!(source_id = %source_id, "Processing url-source event");
        self.set_source_status(source_id, ProcessingStatus::Processing)
            .await;

        let result = self.index_url_source(event).await;
        match &result {
            Ok(chunk_count) => {
                self.set_source_status(source_id, ProcessingStatus::Indexed)
                    .await;
                info!(source_id = %source_id, chunks = chunk_count, "Indexed source");
            }
            Err(e) => {
                error!(source_id = %source_id, error = %e, "Source processing failed");
                self.set_source_status(source_id, ProcessingStatus::Failed)
                    .await;
            }
        }
        result.map(|_| ())
    }

    async fn index_url_source(&self, event: &UrlSourceEvent) -> Result<usize, PipelineError> {
        // Text sources carry their content inline; the pasted text *is*
        // the extracted output. Everything else must have a URL to fetch.
        let (text, url) = if let Some(content) =
            event.metadata.get("content").and_then(|v| v.as_str())
        {
            (content.to_string(), None)
        } else if let Some(url) = event.metadata.get("url").and_then(|v| v.as_str()) {
            let processor = self.factory.create("url", None)?;
            let text = processor
                .process(ExtractInput::Text(url.to_string()))
                .await?;
            (text, Some(url.to_string()))
        } else {
            return Err(PipelineError::MissingMetadata("url"));
        };

        let source_type = if url.is_some() { "url" } else { "text" };
        let chunk = |chunk_text: &str| ChunkData {
            text: chunk_text.to_string(),
            filename: None,
            url: url.clone(),
            source_type: Some(source_type.to_string()),
            metadata: event.metadata.clone(),
        };
        self.index_chunks(
            LogicalId::Source(event.source_id),
            event.owner_id,
            &text,
            chunk,
        )
        .await
    }

    /// Chunk, embed, upsert. Empty text upserts an empty chunk set, which
    /// clears any previously indexed points.
    async fn index_chunks(
        &self,
        logical_id: LogicalId,
        owner_id: Uuid,
        text: &str,
        make_chunk: impl Fn(&str) -> ChunkData,
    ) -> Result<usize, PipelineError> {
        let pieces = self.chunker.split_text(text);
        if pieces.is_empty() {
            warn!(logical_id = %logical_id.uuid(), "No text extracted, indexing zero chunks");
        }

        let embeddings = self
            .embedder
            .embed(&pieces)
            .await
            .map_err(|e| PipelineError::Embed(e.to_string()))?;

        let chunks: Vec<ChunkData> = pieces.iter().map(|p| make_chunk(p)).collect();
        let count = chunks.len();
        self.vector_index
            .upsert_chunks(logical_id, owner_id, chunks, embeddings)
            .await
            .map_err(|e| PipelineError::Index(e.to_string()))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::ProcessingLimits;
    use crate::status::InMemoryStatusStore;
    use bytes::Bytes;
    use nh_embeddings::FakeEmbedder;
    use nh_object_store::InMemoryObjectStore;
    use nh_vector_store::InMemoryVectorIndex;

    struct Fixture {
        pipeline: IndexingPipeline,
        object_store: Arc<InMemoryObjectStore>,
        vector_index: Arc<InMemoryVectorIndex>,
        status: Arc<InMemoryStatusStore>,
    }

    fn fixture() -> Fixture {
        let object_store = Arc::new(InMemoryObjectStore::new("app-docs"));
        let vector_index = Arc::new(InMemoryVectorIndex::new());
        let status = Arc::new(InMemoryStatusStore::new());
        let pipeline = IndexingPipeline::new(
            object_store.clone(),
            vector_index.clone(),
            Arc::new(FakeEmbedder::default()),
            status.clone(),
            ProcessorFactory::new(ProcessingLimits {
                min_file_size_bytes: 1,
                ..ProcessingLimits::default()
            }),
            RecursiveCharacterChunker::new(80, 20),
        );
        Fixture {
            pipeline,
            object_store,
            vector_index,
            status,
        }
    }

    fn document_event(op: EventOp, document_id: Uuid, owner: Uuid, key: &str) -> ChangeEvent {
        ChangeEvent::Document(DocumentEvent {
            op,
            ts_ms: 0,
            document_id,
            version: 1,
            metadata: serde_json::json!({
                "filename": "notes.txt",
                "mime_type": "text/plain",
                "bucket": "app-docs",
                "object_key": key,
            }),
            owner_id: owner,
        })
    }

    #[tokio::test]
    async fn document_create_event_indexes_chunks_and_advances_status() {
        let f = fixture();
        let owner = Uuid::now_v7();
        let document_id = Uuid::now_v7();
        f.object_store
            .put("u/notes.txt", Bytes::from_static(b"hello world\n"), "text/plain")
            .await
            .unwrap();

        f.pipeline
            .handle_event(document_event(EventOp::Create, document_id, owner, "u/notes.txt"))
            .await
            .unwrap();

        let records = f.vector_index.records_for(document_id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chunk_text, "hello world");
        assert_eq!(records[0].owner_id, owner);
        assert_eq!(records[0].filename.as_deref(), Some("notes.txt"));

        assert_eq!(
            f.status.document_history(document_id),
            vec![ProcessingStatus::Processing, ProcessingStatus::Indexed]
        );
    }

    #[tokio::test]
    async fn replayed_create_event_converges_to_the_same_chunk_set() {
        let f = fixture();
        let owner = Uuid::now_v7();
        let document_id = Uuid::now_v7();
        f.object_store
            .put(
                "u/essay.txt",
                Bytes::from_static(
                    b"paragraph one about storage systems.\n\nparagraph two about queues.\n\nparagraph three about indexes.",
                ),
                "text/plain",
            )
            .await
            .unwrap();

        let event = document_event(EventOp::Create, document_id, owner, "u/essay.txt");
        f.pipeline.handle_event(event.clone()).await.unwrap();
        let first: Vec<(i64, String)> = f
            .vector_index
            .records_for(document_id)
            .into_iter()
            .map(|r| (r.chunk_index, r.chunk_text))
            .collect();
        assert!(!first.is_empty());

        // At-least-once delivery: the same record arrives again.
        f.pipeline.handle_event(event).await.unwrap();
        let second: Vec<(i64, String)> = f
            .vector_index
            .records_for(document_id)
            .into_iter()
            .map(|r| (r.chunk_index, r.chunk_text))
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_blob_marks_the_document_failed() {
        let f = fixture();
        let document_id = Uuid::now_v7();

        let err = f
            .pipeline
            .handle_event(document_event(
                EventOp::Create,
                document_id,
                Uuid::now_v7(),
                "u/gone.txt",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
        assert_eq!(
            f.status.document_status(document_id),
            Some(ProcessingStatus::Failed)
        );
        assert_eq!(f.vector_index.point_count(), 0);
    }

    #[tokio::test]
    async fn empty_extraction_indexes_zero_chunks_but_succeeds() {
        let f = fixture();
        let owner = Uuid::now_v7();
        let document_id = Uuid::now_v7();
        f.object_store
            .put("u/blank.txt", Bytes::from_static(b"   \n  \n "), "text/plain")
            .await
            .unwrap();

        f.pipeline
            .handle_event(document_event(EventOp::Create, document_id, owner, "u/blank.txt"))
            .await
            .unwrap();

        assert_eq!(
            f.status.document_status(document_id),
            Some(ProcessingStatus::Indexed)
        );
        assert!(f.vector_index.records_for(document_id).is_empty());
    }

    #[tokio::test]
    async fn text_source_content_is_embedded_inline() {
        let f = fixture();
        let owner = Uuid::now_v7();
        let source_id = Uuid::now_v7();

        f.pipeline
            .handle_event(ChangeEvent::UrlSource(UrlSourceEvent {
                op: EventOp::Create,
                ts_ms: 0,
                source_id,
                version: 1,
                metadata: serde_json::json!({"content": "pasted note about rust workers"}),
                owner_id: owner,
            }))
            .await
            .unwrap();

        let records = f.vector_index.records_for(source_id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_type.as_deref(), Some("text"));
        assert_eq!(records[0].source_id, Some(source_id));
        assert_eq!(
            f.status.source_history(source_id),
            vec![ProcessingStatus::Processing, ProcessingStatus::Indexed]
        );
    }

    #[tokio::test]
    async fn url_source_without_url_fails() {
        let f = fixture();
        let source_id = Uuid::now_v7();

        let err = f
            .pipeline
            .handle_event(ChangeEvent::UrlSource(UrlSourceEvent {
                op: EventOp::Create,
                ts_ms: 0,
                source_id,
                version: 1,
                metadata: serde_json::json!({"note": "no url here"}),
                owner_id: Uuid::now_v7(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingMetadata("url")));
        assert_eq!(
            f.status.source_status(source_id),
            Some(ProcessingStatus::Failed)
        );
    }

    #[tokio::test]
    async fn delete_events_drop_the_points() {
        let f = fixture();
        let owner = Uuid::now_v7();
        let document_id = Uuid::now_v7();
        f.object_store
            .put("u/notes.txt", Bytes::from_static(b"hello world\n"), "text/plain")
            .await
            .unwrap();
        f.pipeline
            .handle_event(document_event(EventOp::Create, document_id, owner, "u/notes.txt"))
            .await
            .unwrap();
        assert_eq!(f.vector_index.point_count(), 1);

        f.pipeline
            .handle_event(document_event(EventOp::Delete, document_id, owner, "u/notes.txt"))
            .await
            .unwrap();
        assert_eq!(f.vector_index.point_count(), 0);
    }
}
