//! Application-wide error types.

use thiserror::Error;

use crate::schema::ValidationError;

#[derive(Debug, Error)]
pub enum FundraiserError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Corrupt document {id}: {reason}")]
    CorruptDocument { id: String, reason: String },

    #[error("Document store is not initialized")]
    NotInitialized,
}

impl FundraiserError {
    /// Whether the error originates in the document store (as opposed to the
    /// caller's input or the process configuration).
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Migrate(_)
                | Self::Json(_)
                | Self::CorruptDocument { .. }
                | Self::NotInitialized
        )
    }
}

pub type Result<T> = std::result::Result<T, FundraiserError>;
