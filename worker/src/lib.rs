//! # NotebookHub Indexing Worker
//!
//! Consumes change events from the bus and turns raw content into
//! searchable vector points: fetch (blob or URL), extract text, chunk,
//! embed, upsert, update status. Processing is at-least-once; every effect
//! is idempotent, so redelivery converges instead of duplicating.

pub mod chunker;
pub mod config;
pub mod pipeline;
pub mod processors;
pub mod status;
pub mod worker;

pub use config::WorkerConfig;
pub use pipeline::IndexingPipeline;
pub use worker::IndexingWorker;
