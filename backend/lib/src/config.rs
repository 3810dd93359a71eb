//! Backend configuration.
//!
//! Loaded from a TOML file with sane local-development defaults; secrets
//! and endpoints can additionally be overridden through environment
//! variables so container deployments never need a config file on disk.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Route prefix for the HTTP surface, e.g. `/api/v1`.
    pub api_prefix: String,
    pub log_format: LogFormat,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub bus: BusConfig,
    pub vector: VectorConfig,
    pub embeddings: EmbeddingsConfig,
    pub limits: LimitsConfig,
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret shared with the token issuer.
    pub secret: String,
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
pub struct LimitsConfig {
    pub max_pdf_size_bytes: usize,
    pub max_docx_size_bytes: usize,
    pub max_txt_size_bytes: usize,
    pub min_file_size_bytes: usize,
    pub max_total_upload_size_bytes: usize,
    pub allowed_file_types: Vec<String>,
    pub max_concurrent_processing_per_user: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Interval between scheduled reconciliation passes.
    pub interval_hours: u64,
}

const MIB: usize = 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_prefix: "/api/v1".to_string(),
            log_format: LogFormat::Text,
            auth: AuthConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            bus: BusConfig::default(),
            vector: VectorConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            limits: LimitsConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: "changethis".to_string(),
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

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pdf_size_bytes: 10 * MIB,
            max_docx_size_bytes: 10 * MIB,
            max_txt_size_bytes: 10 * MIB,
            min_file_size_bytes: 100,
            max_total_upload_size_bytes: 500 * MIB,
            allowed_file_types: ["pdf", "doc", "docx", "txt", "md", "csv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_concurrent_processing_per_user: 5,
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { interval_hours: 24 }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.apply_env();
        Ok(config)
    }

    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Environment overrides for the values that differ per deployment.
    fn apply_env(&mut self) {
        let mut set = |target: &mut String, key: &str| {
            if let Ok(value) = env::var(key) {
                if !value.is_empty() {
                    *target = value;
                }
            }
        };

        set(&mut self.auth.secret, "SECRET_KEY");
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
        if let Ok(value) = env::var("MAX_CONCURRENT_PROCESSING_PER_USER") {
            if let Ok(parsed) = value.parse() {
                self.limits.max_concurrent_processing_per_user = parsed;
            }
        }
        if let Ok(value) = env::var("ALLOWED_FILE_TYPES") {
            let types: Vec<String> = value
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            if !types.is_empty() {
                self.limits.allowed_file_types = types;
            }
        }
    }

    /// Per-extension upload cap (falls back to the TXT limit for text-like
    /// formats).
    pub fn size_limit_for(&self, extension: &str) -> usize {
        match extension {
            "pdf" => self.limits.max_pdf_size_bytes,
            "doc" | "docx" => self.limits.max_docx_size_bytes,
            _ => self.limits.max_txt_size_bytes,
        }
    }
}
