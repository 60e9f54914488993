//! Notification egress (C8): the one interface every higher component
//! (monitor, processor, tariff checker, payment bridge) uses to reach a
//! tenant. Nothing above this crate knows which bot SDK backs it.

pub mod error;

pub use error::{EgressError, Result};

use async_trait::async_trait;
use lw_core::types::UserId;

/// A single inline button row/grid, as `(label, callback_data)` pairs.
/// Kept deliberately minimal — it carries only what spec.md's rendered
/// notifications need (message link, DM link), not a full bot-keyboard DSL.
#[derive(Debug, Clone, Default)]
pub struct Markup {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Debug, Clone)]
pub struct InlineButton {
    pub label: String,
    pub url: String,
}

impl Markup {
    pub fn single_link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            rows: vec![vec![InlineButton {
                label: label.into(),
                url: url.into(),
            }]],
        }
    }
}

/// Thin interface over the notification channel.
#[async_trait]
pub trait Egress: Send + Sync {
    /// Send `body` (HTML-ish inline markup, per spec §4.3 step 4) to
    /// `user_id`, optionally with inline link buttons.
    async fn send(&self, user_id: UserId, body: &str, markup: Option<Markup>) -> Result<()>;

    /// Send a named binary attachment (used by admin/export surfaces; the
    /// core itself only ever calls `send`).
    async fn send_document(
        &self,
        user_id: UserId,
        filename: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<()>;
}
