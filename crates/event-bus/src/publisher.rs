//! At-least-once event publication.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rdkafka::{
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
    ClientConfig,
};
use tracing::{error, info, warn};

use crate::ChangeEvent;

/// How long a single produce call may wait for broker acknowledgement.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

const RETRY_MAX_ATTEMPTS: u32 = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(60);

/// Publisher of change events.
///
/// `publish` returns whether the event reached the broker; it never fails
/// the caller. Write paths treat a `false` as a logged gap for the
/// reconciler, not as a reason to roll anything back.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &ChangeEvent) -> bool;
}

/// Kafka-backed publisher.
///
/// The producer is configured for per-key ordering and duplicate-free
/// delivery: `acks=all`, idempotence on, at most one in-flight request.
/// Construction failure leaves the publisher in a degraded state where
/// every publish logs and returns `false`, so a missing broker never takes
/// the resource service down.
pub struct KafkaEventPublisher {
    producer: Option<FutureProducer>,
    topic: String,
}

impl KafkaEventPublisher {
    pub fn new(bootstrap_servers: &str, topic: impl Into<String>) -> Self {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("max.in.flight.requests.per.connection", "1")
            .set("message.timeout.ms", "10000")
            .create::<FutureProducer>();

        let producer = match producer {
            Ok(producer) => {
                info!(brokers = %bootstrap_servers, "Connected Kafka producer");
                Some(producer)
            }
            Err(e) => {
                error!(brokers = %bootstrap_servers, error = %e, "Failed to create Kafka producer");
                None
            }
        };

        Self {
            producer,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, event: &ChangeEvent) -> bool {
        let Some(producer) = &self.producer else {
            error!("Kafka producer not connected, dropping event");
            return false;
        };

        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize change event");
                return false;
            }
        };
        let key = event.key();

        let mut delay = RETRY_BASE_DELAY;
        for attempt in 1..=RETRY_MAX_ATTEMPTS {
            let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);
            match producer.send(record, Timeout::After(DELIVERY_TIMEOUT)).await {
                Ok((partition, offset)) => {
                    info!(
                        key = %key,
                        op = ?event.op(),
                        topic = %self.topic,
                        partition,
                        offset,
                        "Published change event"
                    );
                    return true;
                }
                Err((e, _)) if attempt < RETRY_MAX_ATTEMPTS => {
                    warn!(
                        key = %key,
                        attempt,
                        error = %e,
                        "Publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(RETRY_MAX_DELAY);
                }
                Err((e, _)) => {
                    error!(key = %key, error = %e, "Publish failed after retries");
                    return false;
                }
            }
        }

        false
    }
}

/// Test double that records every published event in memory.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<ChangeEvent>>,
    /// When false, publish reports failure without recording, simulating an
    /// unreachable broker.
    accept: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            accept: true,
        }
    }

    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            accept: false,
        }
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().clone()
    }

    pub fn take_events(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events.lock())
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &ChangeEvent) -> bool {
        if !self.accept {
            warn!("RecordingPublisher configured to reject events");
            return false;
        }
        self.events.lock().push(event.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventOp;
    use uuid::Uuid;

    #[tokio::test]
    async fn recording_publisher_captures_events_in_order() {
        let publisher = RecordingPublisher::new();
        let id = Uuid::now_v7();
        let owner = Uuid::now_v7();

        for op in [EventOp::Create, EventOp::Update, EventOp::Delete] {
            let ok = publisher
                .publish(&ChangeEvent::document(op, id, 1, serde_json::json!({}), owner))
                .await;
            assert!(ok);
        }

        let events = publisher.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].op(), EventOp::Create);
        assert_eq!(events[2].op(), EventOp::Delete);
    }

    #[tokio::test]
    async fn failing_publisher_reports_false_without_recording() {
        let publisher = RecordingPublisher::failing();
        let ok = publisher
            .publish(&ChangeEvent::url_source(
                EventOp::Create,
                Uuid::now_v7(),
                1,
                serde_json::json!({"url": "https://example.com"}),
                Uuid::now_v7(),
            ))
            .await;
        assert!(!ok);
        assert!(publisher.events().is_empty());
    }
}
