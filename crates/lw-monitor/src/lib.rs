//! Translates the persistent model (active projects, active chats) into
//! live event subscriptions on the session pool and back.

pub mod engine;
pub mod error;
pub mod types;

pub use engine::MonitorEngine;
pub use error::{MonitorError, Result};
pub use types::{CacheClearer, ChatEvent, ChatState};

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::stream::BoxStream;
    use tokio::sync::mpsc;

    use lw_core::types::{ChatHandle, UserId};
    use lw_platform::{
        ChatInfo, Credential, PlatformError, PlatformMessage, PlatformSession, PlatformSessionFactory,
        Result as PlatformResult,
    };
    use lw_sessions::{PoolKind, SessionPool};
    use lw_store::Store;

    use super::*;

    struct FakeSession {
        name: String,
        joinable: bool,
    }

    #[async_trait]
    impl PlatformSession for FakeSession {
        fn name(&self) -> &str {
            &self.name
        }

        async fn is_authorized(&self) -> bool {
            true
        }

        async fn resolve_chat(&self, handle: &ChatHandle) -> PlatformResult<ChatInfo> {
            Ok(ChatInfo {
                numeric_id: 42,
                handle: handle.clone(),
                title: Some("Chat".to_string()),
                total_messages: None,
            })
        }

        async fn join_chat(&self, handle: &ChatHandle, _invite_hash: Option<&str>) -> PlatformResult<ChatInfo> {
            if self.joinable {
                self.resolve_chat(handle).await
            } else {
                Err(PlatformError::JoinFailed {
                    handle: handle.to_string(),
                    reason: "forced failure".to_string(),
                })
            }
        }

        async fn list_dialogs(&self) -> PlatformResult<Vec<ChatInfo>> {
            Ok(vec![])
        }

        fn message_stream(&self) -> BoxStream<'static, PlatformMessage> {
            Box::pin(futures_util::stream::empty())
        }

        async fn history_page(
            &self,
            _chat: &ChatInfo,
            _before_message_id: Option<i64>,
            _limit: u32,
        ) -> PlatformResult<Vec<PlatformMessage>> {
            Ok(vec![])
        }

        async fn send_message(&self, _user_id: UserId, _text: &str) -> PlatformResult<()> {
            Ok(())
        }

        async fn disconnect(&self) {}
    }

    struct FakeFactory {
        joinable: bool,
    }

    #[async_trait]
    impl PlatformSessionFactory for FakeFactory {
        async fn connect(&self, credential: &Credential) -> PlatformResult<Box<dyn PlatformSession>> {
            Ok(Box::new(FakeSession {
                name: credential.name.clone(),
                joinable: self.joinable,
            }))
        }
    }

    fn pool(dir: &std::path::Path, joinable: bool) -> Arc<SessionPool> {
        std::fs::write(dir.join("s1.session"), b"opaque").unwrap();
        std::fs::write(dir.join("s1.json"), r#"{"app_id": 1, "app_hash": "hash"}"#).unwrap();
        let factory: Arc<dyn PlatformSessionFactory> = Arc::new(FakeFactory { joinable });
        let pool = Arc::new(SessionPool::new(PoolKind::Realtime, dir.to_path_buf(), factory));
        pool.refresh_credentials().unwrap();
        pool
    }

    fn engine_with(pool: Arc<SessionPool>, store: Arc<Store>) -> Arc<MonitorEngine> {
        let (tx, _rx) = mpsc::channel(16);
        MonitorEngine::new(store, pool, tx, None, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn start_chat_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let owner = lw_core::types::UserId(1);
        store.get_or_create_user(owner, None, None, None).unwrap();
        let project = store.create_project(owner, "p", None).unwrap();
        let chat = store
            .create_chat(project.id, &ChatHandle::from("@chat"), None, None, None, None)
            .unwrap();

        let engine = engine_with(pool(dir.path(), true), store);
        engine.start_chat(chat.id, project.id).await.unwrap();
        engine.start_chat(chat.id, project.id).await.unwrap();
        assert_eq!(engine.chat_state(chat.id), ChatState::Subscribed);
    }

    #[tokio::test]
    async fn stop_chat_on_unsubscribed_chat_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let engine = engine_with(pool(dir.path(), true), store);
        engine.stop_chat(lw_core::types::ChatId(999)).await;
        assert_eq!(engine.chat_state(lw_core::types::ChatId(999)), ChatState::Disabled);
    }

    #[tokio::test]
    async fn join_failure_leaves_chat_disabled_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let owner = lw_core::types::UserId(1);
        store.get_or_create_user(owner, None, None, None).unwrap();
        let project = store.create_project(owner, "p", None).unwrap();
        let chat = store
            .create_chat(project.id, &ChatHandle::from("@chat"), None, None, None, None)
            .unwrap();

        let engine = engine_with(pool(dir.path(), false), store);
        let err = engine.start_chat(chat.id, project.id).await.unwrap_err();
        assert!(matches!(err, MonitorError::JoinFailed { .. }));
        assert_eq!(engine.chat_state(chat.id), ChatState::Disabled);
    }

    #[tokio::test]
    async fn start_project_starts_every_active_chat() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let owner = lw_core::types::UserId(1);
        store.get_or_create_user(owner, None, None, None).unwrap();
        let project = store.create_project(owner, "p", None).unwrap();
        store
            .create_chat(project.id, &ChatHandle::from("@a"), None, None, None, None)
            .unwrap();
        store
            .create_chat(project.id, &ChatHandle::from("@b"), None, None, None, None)
            .unwrap();

        let engine = engine_with(pool(dir.path(), true), store);
        let started = engine.start_project(project.id).await.unwrap();
        assert_eq!(started, 2);
    }

    #[tokio::test]
    async fn shutdown_disables_every_tracked_chat() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let owner = lw_core::types::UserId(1);
        store.get_or_create_user(owner, None, None, None).unwrap();
        let project = store.create_project(owner, "p", None).unwrap();
        let chat = store
            .create_chat(project.id, &ChatHandle::from("@chat"), None, None, None, None)
            .unwrap();

        let engine = engine_with(pool(dir.path(), true), store);
        engine.start_chat(chat.id, project.id).await.unwrap();
        engine.shutdown().await;
        assert_eq!(engine.chat_state(chat.id), ChatState::Disabled);
    }
}
