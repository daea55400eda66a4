//! SLA Engine Error Types

use thiserror::Error;

/// Result type for SLA engine operations
pub type Result<T> = std::result::Result<T, SlaError>;

/// SLA engine errors
#[derive(Debug, Error)]
pub enum SlaError {
    /// Ticket repository error
    #[error("Repository error: {0}")]
    Repository(String),

    /// Notification delivery error
    #[error("Notification error: {0}")]
    Notification(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Monitor lifecycle error
    #[error("Monitor error: {0}")]
    Monitor(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SlaError {
    fn from(err: serde_json::Error) -> Self {
        SlaError::Serialization(err.to_string())
    }
}
