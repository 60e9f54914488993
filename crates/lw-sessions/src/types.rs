use serde::{Deserialize, Serialize};

use lw_core::types::ChatId;

/// Which on-disk directory a pool was built from — the two configured
/// pool instances are kept disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    /// Clients kept connected for the process lifetime, chats bound long term.
    Realtime,
    /// Clients checked out, used for one operation, released.
    History,
}

/// The `{name}.json` sidecar next to a `{name}.session` credential blob.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialProfile {
    pub app_id: i64,
    pub app_hash: String,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Descriptor returned by `list_info()` for admin surfaces. Captures enough
/// bookkeeping to render a session-archive view without exposing the live
/// client handle.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDescriptor {
    pub name: String,
    pub is_active: bool,
    pub is_valid: bool,
    pub bound_chats: usize,
    pub last_seen: Option<String>,
    pub skip_reason: Option<String>,
}

/// Internal per-active-client bookkeeping: which chats it currently serves.
#[derive(Debug, Default)]
pub(crate) struct ActiveBinding {
    pub(crate) bound_chats: Vec<ChatId>,
}
