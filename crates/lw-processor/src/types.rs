use lw_core::types::{ChatHandle, ProjectId, UserId};

/// Cached result of resolving a chat event's project+chat rows (spec §4.3
/// step 1, 60s TTL).
#[derive(Debug, Clone)]
pub struct CachedChatContext {
    pub project_id: ProjectId,
    pub owner: UserId,
    pub chat_handle: ChatHandle,
    pub chat_title: Option<String>,
    pub project_active: bool,
    pub chat_active: bool,
}

impl CachedChatContext {
    pub fn is_live(&self) -> bool {
        self.project_active && self.chat_active
    }
}
