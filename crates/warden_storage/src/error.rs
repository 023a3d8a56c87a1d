//! Error types for the storage layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unsupported database url: {0}")]
    UnsupportedUrl(String),

    #[error("Invalid table prefix '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidTablePrefix(String),

    #[error("Invalid record in {table}: {message}")]
    InvalidRecord { table: &'static str, message: String },

    #[error("Database did not return an id for the inserted row")]
    MissingInsertId,
}

pub type StorageResult<T> = Result<T, StorageError>;
