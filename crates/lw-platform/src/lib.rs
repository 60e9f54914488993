//! The messaging-platform capability abstraction.
//!
//! `spec.md` §1 is explicit that this system "does not itself implement the
//! messaging-platform protocol — it consumes a client library" and assumes
//! only "a capability set equivalent to: authenticated client, per-chat
//! new-message event subscription, join-chat, list-dialogs, iterate history,
//! send-message." This crate is that capability set, expressed as traits so
//! every other component (`lw-sessions`, `lw-monitor`, `lw-processor`,
//! `lw-history`) depends on the trait rather than on any one wire protocol.
//! `lw-telegram` is the one concrete adapter shipped with this workspace.

pub mod error;
pub mod types;

pub use error::{PlatformError, Result};
pub use types::*;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// A credential discovered on disk.
#[derive(Debug, Clone)]
pub struct Credential {
    /// File stem shared by `{name}.session` and `{name}.json`.
    pub name: String,
    pub app_id: i64,
    pub app_hash: String,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Path to the opaque `{name}.session` blob.
    pub session_path: std::path::PathBuf,
}

/// Produces connected, authorized [`PlatformSession`]s from a [`Credential`].
///
/// Implemented once per wire protocol (`lw-telegram::TelegramSessionFactory`).
/// The session pool (`lw-sessions`) is generic over this trait and never
/// speaks the underlying protocol directly.
#[async_trait]
pub trait PlatformSessionFactory: Send + Sync {
    /// Connect and verify authorization for `credential`. Must fail fast
    /// (no retries) — the caller (session pool) handles candidate rotation.
    async fn connect(&self, credential: &Credential) -> Result<Box<dyn PlatformSession>>;
}

/// A single authenticated, connected client to the messaging platform.
///
/// One `PlatformSession` may be bound to many chats at once (the session
/// pool's least-loaded balancing policy, spec §4.1). Implementations must be
/// safe to share across tasks (`Send + Sync`) since the monitor engine reads
/// `message_stream` concurrently with processor-triggered sends.
#[async_trait]
pub trait PlatformSession: Send + Sync {
    /// Stable name, usually the credential's file stem — used in logs and
    /// admin surfaces.
    fn name(&self) -> &str;

    /// True while the underlying connection is usable.
    async fn is_authorized(&self) -> bool;

    /// Resolve a chat handle to platform chat metadata without joining it.
    async fn resolve_chat(&self, handle: &lw_core::types::ChatHandle) -> Result<ChatInfo>;

    /// Ensure this session's account is a member of `handle`.
    ///
    /// `invite_hash`, when present, is used for private-chat invite links;
    /// otherwise membership is established by username (handles starting
    /// with `@`). Returns [`PlatformError::JoinFailed`] otherwise.
    async fn join_chat(
        &self,
        handle: &lw_core::types::ChatHandle,
        invite_hash: Option<&str>,
    ) -> Result<ChatInfo>;

    /// All dialogs (chats, channels, groups) this session's account is in.
    async fn list_dialogs(&self) -> Result<Vec<ChatInfo>>;

    /// A live stream of every new message seen across every chat this
    /// session is a member of. The monitor engine demultiplexes by
    /// `PlatformMessage::chat`. Calling this more than once per session is
    /// unsupported — one subscription per connected session, matching the
    /// "one `new-message` handler per client" model in spec §4.2.
    fn message_stream(&self) -> BoxStream<'static, PlatformMessage>;

    /// Fetch one page of history, newest-first, strictly older than
    /// `before_message_id` (or from the newest message when `None`).
    async fn history_page(
        &self,
        chat: &ChatInfo,
        before_message_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<PlatformMessage>>;

    /// Send a plain-text (optionally HTML-marked-up) message to a user.
    async fn send_message(&self, user_id: lw_core::types::UserId, text: &str) -> Result<()>;

    /// Disconnect the underlying transport. Implementations should make a
    /// best effort within `timeout` and must not panic on timeout — the
    /// caller force-closes if this doesn't return in time.
    async fn disconnect(&self);
}
