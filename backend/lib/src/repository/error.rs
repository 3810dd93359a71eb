//! Error types for repository operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database operation error from diesel.
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Connection pool error.
    #[error("Pool error: {0}")]
    Pool(String),

    /// Unique-constraint violation, carrying a caller-facing description.
    #[error("{0}")]
    Duplicate(String),
}

impl RepositoryError {
    pub fn is_duplicate(&self) -> bool {
        match self {
            Self::Duplicate(_) => true,
            Self::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => true,
            _ => false,
        }
    }
}

/// Type alias for results that may fail with [`RepositoryError`].
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_detection_covers_both_shapes() {
        assert!(RepositoryError::Duplicate("dup".into()).is_duplicate());

        let diesel_dup = RepositoryError::Database(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_string()),
        ));
        assert!(diesel_dup.is_duplicate());

        assert!(!RepositoryError::Pool("down".into()).is_duplicate());
    }
}
