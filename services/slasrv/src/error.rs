//! Service error types

use thiserror::Error;

/// Result type for slasrv operations
pub type Result<T> = std::result::Result<T, SlasrvError>;

/// SLA service errors
#[derive(Debug, Error)]
pub enum SlasrvError {
    /// Configuration loading/validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// SLA engine error
    #[error("SLA engine error: {0}")]
    Engine(#[from] opsdesk_sla::SlaError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),
}
