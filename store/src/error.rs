//! Error types for the storage layer

use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{entity} has no id")]
    MissingId { entity: &'static str },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid stored value in column {column}: {message}")]
    Decode { column: String, message: String },

    #[error("Schema script {name} failed: {message}")]
    Script { name: &'static str, message: String },

    #[error("Backup file not found: {0}")]
    BackupNotFound(PathBuf),

    #[error("Database file not found: {0}")]
    DatabaseFileMissing(PathBuf),

    #[error("Restore failed: {message} (rolled back: {rolled_back})")]
    Restore { message: String, rolled_back: bool },
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    /// Validation messages, empty for every other error.
    pub fn messages(&self) -> &[String] {
        match self {
            StoreError::Validation(messages) => messages,
            _ => &[],
        }
    }
}
