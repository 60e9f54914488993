use teloxide::types::Message;

use lw_core::types::UserId;
use lw_platform::{PlatformMessage, PlatformSender};

/// Adapt a teloxide `Message` to the platform-agnostic shape every other
/// component depends on.
pub fn to_platform_message(msg: &Message) -> PlatformMessage {
    let sender = msg
        .from()
        .map(|u| PlatformSender {
            user_id: Some(UserId(u.id.0 as i64)),
            display_name: Some(u.full_name()),
            username: u.username.clone(),
        })
        .unwrap_or_else(PlatformSender::unknown);

    PlatformMessage {
        message_id: msg.id.0 as i64,
        chat_numeric_id: msg.chat.id.0,
        date: msg.date,
        text: msg.text().unwrap_or_default().to_string(),
        sender,
    }
}
