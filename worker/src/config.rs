//! Worker configuration: TOML file with defaults, env overrides for the
//! deployment-specific values.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

use crate::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::processors::ProcessingLimits;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub bus: BusConfig,
    pub vector: VectorConfig,
    pub embeddings: EmbeddingsConfig,
    pub processing: ProcessingConfig,
    pub worker: WorkerTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub bootstrap_servers: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub url: String,
    pub collection: String,
    pub dimension: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub max_pdf_size_bytes: usize,
    pub max_docx_size_bytes: usize,
    pub max_txt_size_bytes: usize,
    pub min_file_size_bytes: usize,
    pub max_binary_null_ratio: f64,
    pub url_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerTuning {
    /// Maximum records consumed per poll; also the task fan-out bound.
    pub batch_size: usize,
    /// Sleep between polls that return nothing.
    pub poll_interval_secs: u64,
    /// Hard per-task processing timeout.
    pub task_timeout_secs: u64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            bus: BusConfig::default(),
            vector: VectorConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            processing: ProcessingConfig::default(),
            worker: WorkerTuning::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/notebook_hub".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            access_key: "admin".to_string(),
            secret_key: "changeme".to_string(),
            region: "us-east-1".to_string(),
            bucket: "app-docs".to_string(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            topic: nh_event_bus::DEFAULT_TOPIC.to_string(),
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "documents".to_string(),
            dimension: nh_vector_store::DEFAULT_DIMENSION,
        }
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: nh_embeddings::DEFAULT_MODEL.to_string(),
            dimension: nh_embeddings::DEFAULT_DIMENSION,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        let limits = ProcessingLimits::default();
        Self {
            max_pdf_size_bytes: limits.max_pdf_size_bytes,
            max_docx_size_bytes: limits.max_docx_size_bytes,
            max_txt_size_bytes: limits.max_txt_size_bytes,
            min_file_size_bytes: limits.min_file_size_bytes,
            max_binary_null_ratio: limits.max_binary_null_ratio,
            url_timeout_secs: limits.url_timeout_secs,
        }
    }
}

impl Default for WorkerTuning {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval_secs: 5,
            task_timeout_secs: 300,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl WorkerConfig {
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => WorkerConfig::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        let mut set = |target: &mut String, key: &str| {
            if let Ok(value) = env::var(key) {
                if !value.is_empty() {
                    *target = value;
                }
            }
        };

        set(&mut self.database.url, "DATABASE_URL");
        set(&mut self.storage.endpoint, "MINIO_ENDPOINT");
        set(&mut self.storage.access_key, "MINIO_ROOT_USER");
        set(&mut self.storage.secret_key, "MINIO_ROOT_PASSWORD");
        set(&mut self.storage.bucket, "MINIO_BUCKET");
        set(&mut self.bus.bootstrap_servers, "KAFKA_BOOTSTRAP_SERVERS");
        set(&mut self.bus.topic, "KAFKA_TOPIC_SOURCE_CHANGES");
        set(&mut self.vector.url, "QDRANT_URL");
        set(&mut self.vector.collection, "QDRANT_COLLECTION_NAME");
        set(&mut self.embeddings.model, "OPENAI_MODEL");

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.embeddings.api_key = Some(key);
            }
        }
        if let Ok(value) = env::var("INDEXING_WORKER_BATCH_SIZE") {
            if let Ok(parsed) = value.parse() {
                self.worker.batch_size = parsed;
            }
        }
        if let Ok(value) = env::var("INDEXING_WORKER_CHUNK_SIZE") {
            if let Ok(parsed) = value.parse() {
                self.worker.chunk_size = parsed;
            }
        }
        if let Ok(value) = env::var("INDEXING_WORKER_CHUNK_OVERLAP") {
            if let Ok(parsed) = value.parse() {
                self.worker.chunk_overlap = parsed;
            }
        }
    }

    pub fn processing_limits(&self) -> ProcessingLimits {
        ProcessingLimits {
            max_pdf_size_bytes: self.processing.max_pdf_size_bytes,
            max_docx_size_bytes: self.processing.max_docx_size_bytes,
            max_txt_size_bytes: self.processing.max_txt_size_bytes,
            min_file_size_bytes: self.processing.min_file_size_bytes,
            max_binary_null_ratio: self.processing.max_binary_null_ratio,
            url_timeout_secs: self.processing.url_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = WorkerConfig::default();
        assert_eq!(config.worker.batch_size, 10);
        assert_eq!(config.worker.task_timeout_secs, 300);
        assert_eq!(config.worker.chunk_size, 1000);
        assert_eq!(config.worker.chunk_overlap, 200);
        assert_eq!(config.processing.url_timeout_secs, 25);
        assert_eq!(config.bus.topic, "source_changes");
    }
}
