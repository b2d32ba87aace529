//! Error types for the recipe memory engine

use thiserror::Error;

/// Main error type for the recipe memory engine
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Input rejected before touching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// Similarity index unreadable, corrupt or unwritable
    #[error("Storage error: {0}")]
    Storage(String),

    /// History database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Embedding generation failed
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl MemoryError {
    /// Whether this error comes from one of the persistence targets.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            MemoryError::Storage(_)
                | MemoryError::Database(_)
                | MemoryError::Migration(_)
                | MemoryError::Serialization(_)
                | MemoryError::Io(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MemoryError>;
