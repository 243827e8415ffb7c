//! Error types for the stackdeck deployment store.

use thiserror::Error;

/// Result type alias for deployment store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a store operation can reject a request with.
///
/// A rejected request never mutates state and never notifies subscribers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("invalid replica count {replicas} for service {name}")]
    InvalidReplicas { name: String, replicas: i64 },

    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    #[error("config error: {0}")]
    Config(#[from] stackdeck_core::ConfigError),
}
