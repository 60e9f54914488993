use lw_core::types::ChatHandle;
use lw_egress::Markup;
use lw_platform::{PlatformMessage, PlatformSender};

use crate::keywords::{build_snippet, find_first_match, parse_keywords};

/// A fully rendered notification body plus its inline markup, ready to hand
/// to the egress trait.
pub struct RenderedNotification {
    pub body: String,
    pub markup: Option<Markup>,
}

/// Render the full notification: sender display name and handle, the first
/// matching keyword in its original casing, a link to the source message
/// (handle-based chats only), a DM link to the sender, and the snippet.
pub fn render_full(
    chat_handle: &ChatHandle,
    chat_title: Option<&str>,
    keywords: Option<&str>,
    message: &PlatformMessage,
) -> RenderedNotification {
    let sender_line = format_sender(&message.sender);
    let matched_keyword = keywords
        .map(parse_keywords)
        .filter(|k| !k.is_empty())
        .and_then(|k| find_first_match(&message.text, &k))
        .map(|(_, word)| word);
    let snippet = build_snippet(&message.text, keywords);

    let mut body = String::new();
    body.push_str(&format!(
        "<b>New lead in {}</b>\n",
        chat_title.unwrap_or(chat_handle.0.as_str())
    ));
    body.push_str(&format!("From: {sender_line}\n"));
    if let Some(word) = &matched_keyword {
        body.push_str(&format!("Matched keyword: <b>{word}</b>\n"));
    }
    body.push_str(&format!("\n{snippet}"));

    let mut markup = Markup::default();
    if let Some(url) = message_link(chat_handle, message.message_id) {
        markup.rows.push(vec![lw_egress::InlineButton {
            label: "Open message".to_string(),
            url,
        }]);
    }
    if let Some(url) = dm_link(&message.sender) {
        markup.rows.push(vec![lw_egress::InlineButton {
            label: "Message sender".to_string(),
            url,
        }]);
    }

    RenderedNotification {
        body,
        markup: if markup.rows.is_empty() { None } else { Some(markup) },
    }
}

/// Stub notification for a tenant whose tariff has lapsed (spec §4.3 step 3,
/// §9 open question: adopt the stub per the product decision recorded in
/// DESIGN.md).
pub fn render_stub(support_link: &str) -> RenderedNotification {
    RenderedNotification {
        body: format!(
            "A new message matched one of your monitored chats, but your tariff has ended \
             — full notifications are paused. Renew your tariff to see the details. \
             Need help? {support_link}"
        ),
        markup: None,
    }
}

fn format_sender(sender: &PlatformSender) -> String {
    match (&sender.display_name, &sender.username) {
        (Some(name), Some(username)) => format!("{name} (@{username})"),
        (Some(name), None) => name.clone(),
        (None, Some(username)) => format!("@{username}"),
        (None, None) => "unknown sender".to_string(),
    }
}

/// A direct link to the source message — constructible only for handle-based
/// chats, since a private numeric chat id has no public
/// deep link.
fn message_link(chat_handle: &ChatHandle, message_id: i64) -> Option<String> {
    if chat_handle.is_username() {
        let name = chat_handle.0.trim_start_matches('@');
        Some(format!("https://t.me/{name}/{message_id}"))
    } else {
        None
    }
}

fn dm_link(sender: &PlatformSender) -> Option<String> {
    if let Some(username) = &sender.username {
        Some(format!("https://t.me/{username}"))
    } else {
        sender.user_id.map(|id| format!("tg://user?id={}", id.0))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use lw_platform::PlatformSender;

    use super::*;

    fn message(text: &str, sender: PlatformSender) -> PlatformMessage {
        PlatformMessage {
            message_id: 42,
            chat_numeric_id: 1,
            date: Utc::now(),
            text: text.to_string(),
            sender,
        }
    }

    #[test]
    fn message_link_only_for_username_chats() {
        assert_eq!(
            message_link(&ChatHandle::from("@chat"), 42),
            Some("https://t.me/chat/42".to_string())
        );
        assert_eq!(message_link(&ChatHandle::from("-100123"), 42), None);
    }

    #[test]
    fn render_full_includes_matched_keyword_and_snippet() {
        let msg = message(
            "We need to Buy paint",
            PlatformSender {
                user_id: Some(lw_core::types::UserId(5)),
                display_name: Some("Alice".to_string()),
                username: Some("alice".to_string()),
            },
        );
        let rendered = render_full(&ChatHandle::from("@chat"), Some("Chat"), Some("buy, sell"), &msg);
        assert!(rendered.body.contains("Buy"));
        assert!(rendered.body.contains("Buy paint"));
        assert!(rendered.markup.is_some());
    }

    #[test]
    fn render_full_handles_unresolved_sender() {
        let msg = message("Buy now", PlatformSender::unknown());
        let rendered = render_full(&ChatHandle::from("@chat"), None, Some("buy"), &msg);
        assert!(rendered.body.contains("unknown sender"));
    }

    #[test]
    fn render_stub_mentions_support_link() {
        let rendered = render_stub("https://t.me/support");
        assert!(rendered.body.contains("https://t.me/support"));
    }
}
