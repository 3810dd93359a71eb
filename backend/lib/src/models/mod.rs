//! Request and response bodies for the HTTP surface.

pub mod agent;
pub mod documents;
pub mod messages;
pub mod notebook_sources;
pub mod notebooks;
pub mod search;
pub mod sources;

use serde::Deserialize;

pub(crate) fn default_limit() -> i64 {
    100
}

/// Common `?skip&limit` pagination query.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl Pagination {
    /// Clamps to the documented bounds (`skip >= 0`, `1 <= limit <= 1000`).
    pub fn clamped(self) -> Self {
        Self {
            skip: self.skip.max(0),
            limit: self.limit.clamp(1, 1000),
        }
    }
}
