use thiserror::Error;

use lw_egress::EgressError;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("teloxide error: {0}")]
    Teloxide(#[from] teloxide::RequestError),

    #[error("no bot token configured")]
    NoToken,
}

/// teloxide reports a blocked/deactivated/kicked recipient as an opaque
/// request error; [`crate::session`] has its own mapper onto
/// [`lw_platform::PlatformError`] since the two adapters return different
/// error types for the same underlying condition.
pub(crate) fn map_send_error(e: teloxide::RequestError) -> EgressError {
    let msg = e.to_string();
    if msg.contains("blocked") || msg.contains("deactivated") || msg.contains("kicked") {
        EgressError::RecipientBlocked
    } else {
        EgressError::Transient(msg)
    }
}
