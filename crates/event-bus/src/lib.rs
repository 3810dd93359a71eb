//! Change-event bus for the indexing pipeline.
//!
//! The resource service publishes a lifecycle event for every committed
//! write that affects indexable content; the indexing worker consumes them.
//! Events are keyed by their primary entity id so that all events for one
//! entity land in a single partition and stay ordered relative to each
//! other.
//!
//! Publishing is best-effort from the caller's point of view: the relational
//! write has already committed by the time an event is published, so a
//! failed publish is logged and reported as `false`, never as an error. The
//! reconciler closes the loop on missed events.

pub mod events;
pub mod publisher;

pub use events::{ChangeEvent, DocumentEvent, EventOp, UrlSourceEvent};
pub use publisher::{EventPublisher, KafkaEventPublisher, RecordingPublisher};

/// Default topic carrying both document and URL-source events.
pub const DEFAULT_TOPIC: &str = "source_changes";

/// Consumer group id used by the indexing worker.
pub const CONSUMER_GROUP: &str = "indexing-worker-group";
