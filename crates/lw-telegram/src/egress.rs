use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};

use lw_core::types::UserId;
use lw_egress::{Egress, EgressError, Markup, Result};

use crate::error::map_send_error;

/// The one concrete [`Egress`] this workspace ships (C8, spec §4.8), backed
/// by a long-lived `Bot` handle. Every higher component (monitor, processor,
/// tariff checker, payment bridge) reaches tenants through this, never
/// through `teloxide` directly.
pub struct TelegramEgress {
    bot: Option<Bot>,
}

impl TelegramEgress {
    /// `token` is `None` when no bot token is configured — every send then
    /// fails fast with [`EgressError::NotConfigured`] instead of panicking.
    pub fn new(token: Option<String>) -> Self {
        Self {
            bot: token.map(Bot::new),
        }
    }
}

fn to_inline_keyboard(markup: Markup) -> InlineKeyboardMarkup {
    let rows = markup
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|btn| InlineKeyboardButton::url(btn.label, btn.url.parse().expect("valid button url")))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

#[async_trait]
impl Egress for TelegramEgress {
    async fn send(&self, user_id: UserId, body: &str, markup: Option<Markup>) -> Result<()> {
        let bot = self.bot.as_ref().ok_or(EgressError::NotConfigured)?;
        let mut request = bot.send_message(ChatId(user_id.0), body).parse_mode(ParseMode::Html);
        if let Some(markup) = markup {
            request = request.reply_markup(to_inline_keyboard(markup));
        }
        request.await.map_err(map_send_error)?;
        Ok(())
    }

    async fn send_document(
        &self,
        user_id: UserId,
        filename: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<()> {
        let bot = self.bot.as_ref().ok_or(EgressError::NotConfigured)?;
        let file = InputFile::memory(bytes).file_name(filename.to_string());
        let mut request = bot.send_document(ChatId(user_id.0), file);
        if let Some(caption) = caption {
            request = request.caption(caption.to_string());
        }
        request.await.map_err(map_send_error)?;
        Ok(())
    }
}
