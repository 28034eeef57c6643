//! Trigger store error types.

use thiserror::Error;

use crate::error::AppError;

/// Errors that can occur inside a trigger store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Trigger store operation failed: {0}")]
    Operation(String),

    #[error("Trigger store connection failed: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<AppError> for StoreError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::ConnectionPool { source } => StoreError::Connection(format!("{source:#}")),
            other => StoreError::Operation(format!("{:#}", anyhow::Error::from(other))),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}
