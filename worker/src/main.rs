//! NotebookHub Indexing Worker Binary

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nh_embeddings::{Embedder, OpenAiEmbedder};
use nh_indexing_worker::chunker::RecursiveCharacterChunker;
use nh_indexing_worker::processors::ProcessorFactory;
use nh_indexing_worker::status::PgStatusStore;
use nh_indexing_worker::{IndexingPipeline, IndexingWorker, WorkerConfig};
use nh_object_store::{ObjectStorage, S3Config, S3ObjectStore};
use nh_vector_store::{QdrantIndex, VectorIndex};

#[derive(Parser, Debug)]
#[command(name = "indexing-worker")]
#[command(about = "NotebookHub Indexing Worker", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = WorkerConfig::load(args.config.as_deref()).context("Failed to load config")?;

    info!("Starting indexing worker");

    let pool = nh_db::setup_db_pool(config.database.url.clone())
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!("Connected to PostgreSQL");

    let object_store = Arc::new(S3ObjectStore::new(S3Config {
        endpoint: config.storage.endpoint.clone(),
        access_key: config.storage.access_key.clone(),
        secret_key: config.storage.secret_key.clone(),
        region: config.storage.region.clone(),
        bucket: config.storage.bucket.clone(),
    }));

    let vector_index: Arc<dyn VectorIndex> = Arc::new(
        QdrantIndex::connect(
            &config.vector.url,
            config.vector.collection.clone(),
            config.vector.dimension,
        )
        .context("Failed to create Qdrant client")?,
    );
    vector_index
        .ensure_collection()
        .await
        .context("Failed to ensure vector collection")?;
    object_store
        .ensure_bucket()
        .await
        .context("Failed to ensure blob bucket")?;

    let embedder = Arc::new(OpenAiEmbedder::new(
        config.embeddings.api_key.clone(),
        config.embeddings.model.clone(),
        config.embeddings.dimension,
    ));
    if !embedder.is_available() {
        warn!("Embeddings are not configured, indexing will fail until OPENAI_API_KEY is set");
    }

    let pipeline = Arc::new(IndexingPipeline::new(
        object_store,
        vector_index,
        embedder,
        Arc::new(PgStatusStore::new(pool)),
        ProcessorFactory::new(config.processing_limits()),
        RecursiveCharacterChunker::new(config.worker.chunk_size, config.worker.chunk_overlap),
    ));

    let worker = IndexingWorker::new(
        &config.bus.bootstrap_servers,
        &config.bus.topic,
        pipeline,
        config.worker.batch_size,
        Duration::from_secs(config.worker.poll_interval_secs),
        Duration::from_secs(config.worker.task_timeout_secs),
    )
    .context("Failed to create Kafka consumer")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, draining in-flight work");
            let _ = shutdown_tx.send(true);
        }
    });

    worker.run(shutdown_rx).await;
    info!("Shutdown complete");
    Ok(())
}
