use lw_core::types::{ChatId, ProjectId};
use lw_platform::PlatformMessage;

/// State machine per `MonitoredChat`:
///
/// ```text
/// DISABLED --enable--> JOINING --join ok--> SUBSCRIBED --disable--> DRAINING --> DISABLED
///              ^                   |
///              +----join fail------+  (terminal on this tick; retried by maintenance)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Disabled,
    Joining,
    Subscribed,
    Draining,
}

/// A platform message paired with the routing context the processor needs
///.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub project_id: ProjectId,
    pub chat_id: ChatId,
    pub keywords: Option<String>,
    pub message: PlatformMessage,
}

/// Implemented by the message processor so the monitor's maintenance loop
/// can invalidate its project/chat/tariff caches without this crate
/// depending on `lw-processor` directly.
pub trait CacheClearer: Send + Sync {
    fn clear_caches(&self);
}
