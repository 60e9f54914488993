use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionPoolError {
    #[error("no usable session available in this pool")]
    NoSessionAvailable,

    #[error("session {0} is already checked out")]
    AlreadyInUse(String),

    #[error("session {0} not found in this pool")]
    NotFound(String),

    #[error("credential discovery failed: {0}")]
    Discovery(String),

    #[error(transparent)]
    Platform(#[from] lw_platform::PlatformError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid credential json for {name}: {source}")]
    InvalidCredential {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, SessionPoolError>;
