use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Session(#[from] lw_sessions::SessionPoolError),

    #[error(transparent)]
    Platform(#[from] lw_platform::PlatformError),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
