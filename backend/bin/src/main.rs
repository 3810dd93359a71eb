//! NotebookHub Backend Binary
//!
//! Main entry point for the NotebookHub resource service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use nh_backend_lib::api::create_app;
use nh_backend_lib::config::Config;
use nh_backend_lib::log::initialize_logging;
use nh_backend_lib::repository::PostgresRepository;
use nh_backend_lib::services::rate_limit::DbRateLimiter;
use nh_backend_lib::services::reconciler::spawn_cleanup_scheduler;
use nh_backend_lib::services::Services;
use nh_embeddings::{Embedder, OpenAiEmbedder};
use nh_event_bus::KafkaEventPublisher;
use nh_object_store::{ObjectStorage, S3Config, S3ObjectStore};
use nh_vector_store::{QdrantIndex, VectorIndex};

#[derive(Parser, Debug)]
#[command(name = "nh-backend")]
#[command(about = "NotebookHub Backend Service", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Override server host
    #[arg(long)]
    host: Option<String>,

    /// Override server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    initialize_logging(config.log_format);

    info!("Starting NotebookHub Backend");
    info!("Server will run on {}:{}", config.host, config.port);

    let services = build_services(&config).await?;

    // External stores bootstrap themselves idempotently at startup.
    services
        .object_store
        .ensure_bucket()
        .await
        .context("Failed to ensure blob bucket")?;
    services
        .vector_index
        .ensure_collection()
        .await
        .context("Failed to ensure vector collection")?;

    let scheduler = spawn_cleanup_scheduler(
        services.clone(),
        Duration::from_secs(config.cleanup.interval_hours * 3600),
    );

    let app = create_app(services);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .context("Failed to bind TCP listener")?;

    info!("Server listening on http://{}:{}", config.host, config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scheduler.abort();
    info!("Shutdown complete");
    Ok(())
}

fn load_config() -> Result<Config> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database.url = database_url;
    }

    Ok(config)
}

async fn build_services(config: &Config) -> Result<Services> {
    let pool = nh_db::setup_db_pool(config.database.url.clone())
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!("Connected to PostgreSQL");
    let repository = Arc::new(PostgresRepository::new(pool));

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

    let embedder = Arc::new(OpenAiEmbedder::new(
        config.embeddings.api_key.clone(),
        config.embeddings.model.clone(),
        config.embeddings.dimension,
    ));
    if !embedder.is_available() {
        warn!("Embeddings are not configured, search and retrieval will be degraded");
    }

    let publisher = Arc::new(KafkaEventPublisher::new(
        &config.bus.bootstrap_servers,
        config.bus.topic.clone(),
    ));

    let rate_limiter = Arc::new(DbRateLimiter::new(
        repository.clone(),
        config.limits.max_concurrent_processing_per_user,
    ));

    Ok(Services::new(
        Arc::new(config.clone()),
        repository,
        object_store,
        vector_index,
        embedder,
        publisher,
        rate_limiter,
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received, draining in-flight requests");
}
