use thiserror::Error;

use lw_core::types::{ChatId, ProjectId};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("chat not found: {0}")]
    ChatNotFound(ChatId),

    #[error("failed to join chat {chat_id}: {reason}")]
    JoinFailed { chat_id: ChatId, reason: String },

    #[error(transparent)]
    Session(#[from] lw_sessions::SessionPoolError),

    #[error(transparent)]
    Platform(#[from] lw_platform::PlatformError),

    #[error(transparent)]
    Store(#[from] lw_store::StoreError),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
