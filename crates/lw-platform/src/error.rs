use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("no authorized credential available")]
    NoSessionAvailable,

    #[error("failed to join chat {handle}: {reason}")]
    JoinFailed { handle: String, reason: String },

    #[error("rate limited, retry after {wait_secs}s")]
    RateLimited { wait_secs: u64 },

    #[error("chat not found or inaccessible: {0}")]
    ChatNotFound(String),

    #[error("recipient has blocked the bot or deleted their account")]
    RecipientBlocked,

    #[error("transient delivery failure: {0}")]
    Transient(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;
