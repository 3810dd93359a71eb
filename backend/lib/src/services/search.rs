//! Vector similarity search over a user's own content.

use tracing::error;

use nh_vector_store::SearchFilter;

use crate::error::{Error, Result};
use crate::models::search::{
    EmbeddingsHealth, QdrantHealth, SearchHealth, SearchQuery, SearchResult, SearchResults,
};
use crate::services::{CurrentUser, Services};

const MAX_LIMIT: u64 = 50;

pub struct SearchService {
    services: Services,
}

impl SearchService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    pub async fn search(&self, user: &CurrentUser, query: SearchQuery) -> Result<SearchResults> {
        if query.query.trim().is_empty() {
            return Err(Error::BadRequest("query must not be empty".to_string()));
        }
        let limit = query.limit.clamp(1, MAX_LIMIT);
        let score_threshold = query.score_threshold.clamp(0.0, 1.0);

        let embedding = self
            .services
            .embedder
            .embed_one(&query.query)
            .await
            .map_err(|e| {
                error!(error = %e, "Query embedding failed");
                Error::OperationFailed("Search failed".to_string())
            })?;

        let hits = self
            .services
            .vector_index
            .search(
                embedding,
                limit,
                score_threshold,
                SearchFilter::for_owner(user.id),
            )
            .await
            .map_err(|e| {
                error!(error = %e, "Vector search failed");
                Error::OperationFailed("Search failed".to_string())
            })?;

        let results: Vec<SearchResult> = hits
            .into_iter()
            .map(|hit| SearchResult {
                document_id: hit.record.ref_id(),
                filename: hit.record.filename.unwrap_or_default(),
                score: hit.score,
                chunk_text: hit.record.chunk_text,
                chunk_index: hit.record.chunk_index,
                metadata: hit.record.metadata,
            })
            .collect();

        Ok(SearchResults {
            total: results.len(),
            results,
            query: query.query,
        })
    }

    pub async fn health(&self) -> SearchHealth {
        let collection = self.services.vector_index.collection_info().await;
        let qdrant = QdrantHealth {
            connected: collection.is_ok(),
            points_count: collection.ok().and_then(|info| info.points_count),
        };
        let openai = EmbeddingsHealth {
            available: self.services.embedder.is_available(),
            model: self.services.embedder.model().to_string(),
        };
        let status = if qdrant.connected && openai.available {
            "healthy"
        } else {
            "unhealthy"
        };
        SearchHealth {
            status: status.to_string(),
            qdrant,
            openai,
        }
    }
}
