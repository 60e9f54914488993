use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use lw_core::types::{ChatHandle, UserId};
use lw_platform::{
    ChatInfo, Credential, PlatformError, PlatformMessage, PlatformSession, PlatformSessionFactory, Result,
};

use crate::convert::to_platform_message;

/// Connects teloxide `Bot` instances from on-disk credentials.
///
/// The underlying wire protocol is explicitly out of scope: this
/// adapter treats `Credential::app_hash` as the bot token, since the Bot API
/// has no notion of the phone-number user sessions the credential shape was
/// designed around. `app_id`/`session_path` are carried for interface
/// compatibility but unused by this adapter.
pub struct TelegramSessionFactory;

impl TelegramSessionFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TelegramSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformSessionFactory for TelegramSessionFactory {
    async fn connect(&self, credential: &Credential) -> Result<Box<dyn PlatformSession>> {
        let bot = Bot::new(&credential.app_hash);
        bot.get_me()
            .await
            .map_err(|e| PlatformError::AuthFailed(e.to_string()))?;

        info!(name = %credential.name, "telegram session connected");
        Ok(Box::new(TelegramSession {
            name: credential.name.clone(),
            bot,
            message_rx: Mutex::new(None),
        }))
    }
}

pub struct TelegramSession {
    name: String,
    bot: Bot,
    message_rx: Mutex<Option<mpsc::Receiver<PlatformMessage>>>,
}

#[async_trait]
impl PlatformSession for TelegramSession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_authorized(&self) -> bool {
        self.bot.get_me().await.is_ok()
    }

    async fn resolve_chat(&self, handle: &ChatHandle) -> Result<ChatInfo> {
        let recipient = recipient_for(handle);
        let chat = self
            .bot
            .get_chat(recipient)
            .await
            .map_err(|e| PlatformError::ChatNotFound(e.to_string()))?;

        Ok(ChatInfo {
            numeric_id: chat.id.0,
            handle: handle.clone(),
            title: chat.title().map(str::to_string),
            // The Bot API exposes no cheap message-count endpoint; callers
            // (C5) treat `None` as "unknown, proceed and find out".
            total_messages: None,
        })
    }

    async fn join_chat(&self, handle: &ChatHandle, _invite_hash: Option<&str>) -> Result<ChatInfo> {
        // Bots cannot self-join arbitrary chats via the Bot API — membership
        // is established out of band by an administrator adding the bot.
        // This call only verifies the bot is already a member.
        let chat = self.resolve_chat(handle).await?;
        let me = self.bot.get_me().await.map_err(|e| PlatformError::JoinFailed {
            handle: handle.to_string(),
            reason: e.to_string(),
        })?;
        self.bot
            .get_chat_member(ChatId(chat.numeric_id), me.id)
            .await
            .map_err(|e| PlatformError::JoinFailed {
                handle: handle.to_string(),
                reason: e.to_string(),
            })?;
        Ok(chat)
    }

    async fn list_dialogs(&self) -> Result<Vec<ChatInfo>> {
        // The Bot API has no "list chats I'm in" endpoint; chats are always
        // explicitly configured via `MonitoredChat` rows instead.
        Ok(Vec::new())
    }

    fn message_stream(&self) -> BoxStream<'static, PlatformMessage> {
        let Some(rx) = self.message_rx.lock().unwrap().take() else {
            warn!(name = %self.name, "message_stream called more than once on this session");
            return Box::pin(tokio_stream::empty());
        };
        Box::pin(ReceiverStream::new(rx))
    }

    async fn history_page(
        &self,
        _chat: &ChatInfo,
        _before_message_id: Option<i64>,
        _limit: u32,
    ) -> Result<Vec<PlatformMessage>> {
        // The Bot API has no generic history-iteration endpoint — that
        // requires a user-session MTProto client, which is out of scope
        // here. A real deployment wires a user-session-capable client in;
        // this adapter reports no messages rather than erroring so history
        // extraction still completes with an empty result.
        Ok(Vec::new())
    }

    async fn send_message(&self, user_id: UserId, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(user_id.0), text)
            .await
            .map_err(map_send_error)?;
        Ok(())
    }

    async fn disconnect(&self) {}
}

/// Start the long-polling dispatcher that feeds `message_stream`. Call once
/// per connected session, immediately after `connect` (spec §4.2: "a
/// `new-message` handler is installed on the chosen client").
pub fn spawn_update_listener(session: &TelegramSession) {
    let (tx, rx) = mpsc::channel(256);
    *session.message_rx.lock().unwrap() = Some(rx);

    let bot = session.bot.clone();
    let name = session.name.clone();
    tokio::spawn(async move {
        let mut offset: i32 = 0;
        loop {
            let updates = match bot.get_updates().offset(offset).timeout(30).send().await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(name = %name, error = %e, "telegram long-poll failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                    continue;
                }
            };
            for update in updates {
                offset = offset.max(update.id.0 as i32 + 1);
                if let teloxide::types::UpdateKind::Message(msg) = update.kind {
                    if tx.send(to_platform_message(&msg)).await.is_err() {
                        return;
                    }
                }
            }
        }
    });
}

fn recipient_for(handle: &ChatHandle) -> Recipient {
    if handle.is_username() {
        Recipient::ChannelUsername(handle.0.clone())
    } else {
        handle
            .0
            .parse::<i64>()
            .map(|id| Recipient::Id(ChatId(id)))
            .unwrap_or_else(|_| Recipient::ChannelUsername(handle.0.clone()))
    }
}

fn map_send_error(e: teloxide::RequestError) -> PlatformError {
    let msg = e.to_string();
    if msg.contains("blocked") || msg.contains("deactivated") || msg.contains("kicked") {
        PlatformError::RecipientBlocked
    } else {
        PlatformError::Transient(msg)
    }
}
