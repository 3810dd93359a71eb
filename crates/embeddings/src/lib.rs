//! Embedding model client.
//!
//! One batched call per chunk set; the caller relies on the post-condition
//! that the returned vectors are parallel to the input texts.

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client,
};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

/// Default embedding model and its dimension.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_DIMENSION: usize = 1536;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding model not configured")]
    NotConfigured,

    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding count mismatch: expected {expected}, got {got}")]
    CountMismatch { expected: usize, got: usize },
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds `texts` in one batched request. Guarantees
    /// `result.len() == texts.len()` on success.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(std::slice::from_ref(&text.to_string())).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            got: 0,
        })
    }

    fn dimension(&self) -> usize;

    fn model(&self) -> &str;

    /// Whether the backing service is configured (health endpoint signal).
    fn is_available(&self) -> bool {
        true
    }
}

/// OpenAI-backed embedder.
pub struct OpenAiEmbedder {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    /// `api_key = None` produces a degraded embedder whose calls fail with
    /// [`EmbeddingError::NotConfigured`]; startup proceeds so the rest of
    /// the service stays usable.
    pub fn new(api_key: Option<String>, model: impl Into<String>, dimension: usize) -> Self {
        let client = match api_key {
            Some(key) if !key.is_empty() => {
                info!("OpenAI embeddings client initialized");
                Some(Client::with_config(OpenAIConfig::new().with_api_key(key)))
            }
            _ => {
                tracing::error!("OPENAI_API_KEY not set, embeddings disabled");
                None
            }
        };
        Self {
            client,
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let client = self.client.as_ref().ok_or(EmbeddingError::NotConfigured)?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), model = %self.model, "Embedding batch");
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(texts.to_vec()))
            .build()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let response = client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        self.client.is_some()
    }
}

/// Deterministic embedder for tests: each whitespace token is hashed into a
/// bucket and the resulting count vector is L2-normalized. Texts sharing
/// tokens get positive cosine similarity, so ranking assertions are
/// meaningful without a live model.
pub struct FakeEmbedder {
    dimension: usize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self::new(32)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; self.dimension];
                for token in text.split_whitespace() {
                    let token = token
                        .trim_matches(|c: char| !c.is_alphanumeric())
                        .to_lowercase();
                    if token.is_empty() {
                        continue;
                    }
                    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
                    for byte in token.as_bytes() {
                        hash ^= u64::from(*byte);
                        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
                    }
                    vector[(hash % self.dimension as u64) as usize] += 1.0;
                }
                let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for value in &mut vector {
                        *value /= norm;
                    }
                }
                vector
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        "fake-embedder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_embedder_is_deterministic_and_parallel() {
        let embedder = FakeEmbedder::default();
        let texts = vec!["hello world".to_string(), "goodbye".to_string()];
        let first = embedder.embed(&texts).await.unwrap();
        let second = embedder.embed(&texts).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn shared_tokens_score_higher_than_disjoint_ones() {
        let embedder = FakeEmbedder::default();
        let vectors = embedder
            .embed(&[
                "hello world".to_string(),
                "hello there".to_string(),
                "completely unrelated phrase".to_string(),
            ])
            .await
            .unwrap();

        let cosine = |a: &[f32], b: &[f32]| -> f32 {
            a.iter().zip(b).map(|(x, y)| x * y).sum()
        };
        let related = cosine(&vectors[0], &vectors[1]);
        let unrelated = cosine(&vectors[0], &vectors[2]);
        assert!(related > unrelated);
    }

    #[tokio::test]
    async fn unconfigured_openai_embedder_fails_cleanly() {
        let embedder = OpenAiEmbedder::new(None, DEFAULT_MODEL, DEFAULT_DIMENSION);
        assert!(!embedder.is_available());
        let err = embedder.embed(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::NotConfigured));
    }
}
