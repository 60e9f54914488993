use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lw_core::types::{ChatHandle, UserId};

/// Platform-side metadata for a chat, independent of our own `ChatId` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    /// The platform's own numeric chat id.
    pub numeric_id: i64,
    pub handle: ChatHandle,
    pub title: Option<String>,
    /// Total message count, when the platform can report it cheaply.
    pub total_messages: Option<u64>,
}

/// The sender of a [`PlatformMessage`]. `None` fields mean the platform
/// could not resolve the sender (spec §8 "Filter ordering" — admission must
/// not depend on successful sender resolution).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSender {
    pub user_id: Option<UserId>,
    pub display_name: Option<String>,
    pub username: Option<String>,
}

impl PlatformSender {
    pub fn unknown() -> Self {
        Self {
            user_id: None,
            display_name: None,
            username: None,
        }
    }
}

/// A single message observed in a monitored chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMessage {
    pub message_id: i64,
    pub chat_numeric_id: i64,
    pub date: DateTime<Utc>,
    pub text: String,
    pub sender: PlatformSender,
}
