//! The consumer loop.
//!
//! One consumer group polls the change topic in batches; each record
//! becomes a task, the batch fans out concurrently and is awaited before
//! the next poll. Offsets are stored per record after its task finishes
//! (auto-commit then persists them); a task that exceeds the hard timeout
//! leaves its offset unstored, so the record is redelivered and retried.
//! Pipeline errors do *not* hold the offset back: the entity is marked
//! `failed` and the record is not re-enqueued.

use std::sync::Arc;
use std::time::Duration;

use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    error::KafkaError,
    message::{Message, OwnedMessage},
    ClientConfig,
};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use nh_event_bus::{ChangeEvent, CONSUMER_GROUP};

use crate::pipeline::IndexingPipeline;

/// How long one poll waits for the first/next record.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

pub struct IndexingWorker {
    consumer: StreamConsumer,
    pipeline: Arc<IndexingPipeline>,
    batch_size: usize,
    poll_interval: Duration,
    task_timeout: Duration,
}

impl IndexingWorker {
    pub fn new(
        bootstrap_servers: &str,
        topic: &str,
        pipeline: Arc<IndexingPipeline>,
        batch_size: usize,
        poll_interval: Duration,
        task_timeout: Duration,
    ) -> Result<Self, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", CONSUMER_GROUP)
            .set("bootstrap.servers", bootstrap_servers)
            .set("enable.auto.commit", "true")
            // Offsets are stored explicitly per processed record so a
            // timed-out task is redelivered.
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;
        consumer.subscribe(&[topic])?;
        info!(topic = %topic, group = CONSUMER_GROUP, "Subscribed to change topic");

        Ok(Self {
            consumer,
            pipeline,
            batch_size,
            poll_interval,
            task_timeout,
        })
    }

    /// Runs until `shutdown` flips to true. The batch in flight when the
    /// signal arrives is drained before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Indexing worker started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let batch = tokio::select! {
                batch = self.poll_batch() => batch,
                _ = shutdown.changed() => continue,
            };

            if batch.is_empty() {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    _ = shutdown.changed() => {}
                }
                continue;
            }

            info!(count = batch.len(), "Processing batch of change events");
            self.process_batch(batch).await;
        }
        info!("Indexing worker stopped");
    }

    async fn poll_batch(&self) -> Vec<OwnedMessage> {
        let mut batch = Vec::new();
        let deadline = tokio::time::Instant::now() + POLL_TIMEOUT;
        while batch.len() < self.batch_size {
            match tokio::time::timeout_at(deadline, self.consumer.recv()).await {
                Ok(Ok(message)) => batch.push(message.detach()),
                Ok(Err(e)) => {
                    error!(error = %e, "Kafka receive error");
                    break;
                }
                Err(_) => break,
            }
        }
        batch
    }

    async fn process_batch(&self, batch: Vec<OwnedMessage>) {
        let mut tasks: JoinSet<(String, i32, i64, bool)> = JoinSet::new();

        for message in batch {
            let topic = message.topic().to_string();
            let partition = message.partition();
            let offset = message.offset();

            let event: ChangeEvent = match message
                .payload()
                .ok_or("empty payload".to_string())
                .and_then(|payload| {
                    serde_json::from_slice(payload).map_err(|e| e.to_string())
                }) {
                Ok(event) => event,
                Err(e) => {
                    // Poison records are logged and skipped; redelivering
                    // them would wedge the partition.
                    error!(partition, offset, error = %e, "Undecodable change record");
                    self.store_offset(&topic, partition, offset);
                    continue;
                }
            };

            let pipeline = self.pipeline.clone();
            let task_timeout = self.task_timeout;
            tasks.spawn(async move {
                let timed_out =
                    match tokio::time::timeout(task_timeout, pipeline.handle_event(event)).await {
                        Ok(Ok(())) => false,
                        Ok(Err(e)) => {
                            // The pipeline already marked the entity failed.
                            error!(partition, offset, error = %e, "Event processing failed");
                            false
                        }
                        Err(_) => {
                            error!(
                                partition,
                                offset,
                                timeout_secs = task_timeout.as_secs(),
                                "Event processing timed out, record will be redelivered"
                            );
                            true
                        }
                    };
                (topic, partition, offset, timed_out)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((topic, partition, offset, timed_out)) => {
                    if !timed_out {
                        self.store_offset(&topic, partition, offset);
                    }
                }
                Err(e) => error!(error = %e, "Event task panicked"),
            }
        }
    }

    fn store_offset(&self, topic: &str, partition: i32, offset: i64) {
        if let Err(e) = self.consumer.store_offset(topic, partition, offset) {
            warn!(partition, offset, error = %e, "Failed to store offset");
        }
    }
}
