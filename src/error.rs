//! Error handling module
//!
//! Provides unified error types for the entire application.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Storage API error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response shape: {0}")]
    Parse(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias used throughout the crate
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Whether this failure terminates the run when it occurs inside a
    /// per-table or per-folder loop. Connection-level failures do;
    /// everything else is reported inline and iteration continues.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Connection(_) | AppError::Config(_))
    }
}
