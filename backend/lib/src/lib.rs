//! # NotebookHub Backend Library
//!
//! Core library for the NotebookHub resource service: the HTTP surface for
//! notebooks, sources, documents and retrieval, the repository layer over
//! PostgreSQL, and the reconciler that keeps the relational, blob and
//! vector stores convergent.

pub mod api;
pub mod config;
pub mod error;
pub mod log;
pub mod models;
pub mod repository;
pub mod services;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::create_app;
pub use config::Config;
pub use error::{Error, Result};
