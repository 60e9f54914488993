use thiserror::Error;

/// Crate-wide error type for configuration and cross-cutting concerns.
///
/// Component-specific errors (session pool, monitor, processor, ...) live in
/// their own crates and convert into this one only at the composition root.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("required configuration key missing: {0}")]
    ConfigMissing(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
