use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use lw_core::config::{
    DELIVERY_BACKOFF_BASE_SECS, DELIVERY_CONCURRENCY, DELIVERY_MAX_RETRIES,
    KEYWORD_WORKER_COUNT, PROJECT_CHAT_CACHE_TTL_SECS, TARIFF_CACHE_TTL_SECS,
};
use lw_core::types::{ChatId, UserId};
use lw_egress::Egress;
use lw_monitor::types::{CacheClearer, ChatEvent};
use lw_store::Store;

use crate::cache::TtlCache;
use crate::keywords::admits;
use crate::render::{render_full, render_stub};
use crate::types::CachedChatContext;

/// The message-dispatch pipeline: keyword filtering,
/// tariff-aware rendering, bounded-concurrency fan-out with retries.
pub struct MessageProcessor {
    store: Arc<Store>,
    egress: Arc<dyn Egress>,
    support_link: String,
    project_chat_cache: TtlCache<ChatId, CachedChatContext>,
    tariff_cache: TtlCache<UserId, bool>,
    delivery_semaphore: Arc<Semaphore>,
    keyword_semaphore: Arc<Semaphore>,
    stop_chat_tx: mpsc::Sender<ChatId>,
}

impl MessageProcessor {
    pub fn new(
        store: Arc<Store>,
        egress: Arc<dyn Egress>,
        support_link: String,
        stop_chat_tx: mpsc::Sender<ChatId>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            egress,
            support_link,
            project_chat_cache: TtlCache::new(Duration::from_secs(PROJECT_CHAT_CACHE_TTL_SECS as u64)),
            tariff_cache: TtlCache::new(Duration::from_secs(TARIFF_CACHE_TTL_SECS as u64)),
            delivery_semaphore: Arc::new(Semaphore::new(DELIVERY_CONCURRENCY)),
            keyword_semaphore: Arc::new(Semaphore::new(KEYWORD_WORKER_COUNT)),
            stop_chat_tx,
        })
    }

    /// Run the full pipeline for one event. Callers must not `.await` this
    /// inline with event ingestion — the monitor's demux task
    /// forwards events over a channel and a separate consumer task spawns
    /// one `process_event` call per event.
    pub async fn process_event(self: &Arc<Self>, event: ChatEvent) {
        let Some(ctx) = self.resolve_context(&event).await else {
            return;
        };

        if !ctx.is_live() {
            debug!(chat_id = %event.chat_id, "chat/project no longer active, requesting stop");
            if self.stop_chat_tx.try_send(event.chat_id).is_err() {
                warn!(chat_id = %event.chat_id, "stop-chat channel full or closed");
            }
            return;
        }

        let text = event.message.text.clone();
        let keywords = event.keywords.clone();
        let permit = self.keyword_semaphore.clone().acquire_owned().await;
        let matched = {
            let text = text.clone();
            tokio::task::spawn_blocking(move || admits(&text, keywords.as_deref()))
                .await
                .unwrap_or(false)
        };
        drop(permit);

        if !matched {
            return;
        }

        let tariff_active = self.tariff_active(ctx.owner).await;
        let rendered = if tariff_active {
            render_full(&ctx.chat_handle, ctx.chat_title.as_deref(), event.keywords.as_deref(), &event.message)
        } else {
            render_stub(&self.support_link)
        };

        self.deliver(ctx.owner, rendered).await;
    }

    async fn resolve_context(&self, event: &ChatEvent) -> Option<CachedChatContext> {
        if let Some(cached) = self.project_chat_cache.get(&event.chat_id) {
            return Some(cached);
        }

        let store = self.store.clone();
        let chat_id = event.chat_id;
        let project_id = event.project_id;
        let loaded = tokio::task::spawn_blocking(move || {
            let chat = store.get_chat(chat_id).ok().flatten();
            let project = store.get_project(project_id).ok().flatten();
            (chat, project)
        })
        .await
        .ok()?;

        let (chat, project) = loaded;
        let (chat_active, chat_handle, chat_title) = match &chat {
            Some(c) => (c.is_active, c.chat_handle.clone(), c.title.clone()),
            None => (false, placeholder_chat_handle(event), None),
        };
        let (project_active, owner) = match &project {
            Some(p) => (p.is_active, p.user_id),
            None => (false, UserId(0)),
        };

        let ctx = CachedChatContext {
            project_id,
            owner,
            chat_handle,
            chat_title,
            project_active,
            chat_active,
        };
        self.project_chat_cache.insert(event.chat_id, ctx.clone());
        Some(ctx)
    }

    async fn tariff_active(&self, owner: UserId) -> bool {
        if let Some(active) = self.tariff_cache.get(&owner) {
            return active;
        }
        let store = self.store.clone();
        let active = tokio::task::spawn_blocking(move || store.is_tariff_active(owner).unwrap_or(false))
            .await
            .unwrap_or(false);
        self.tariff_cache.insert(owner, active);
        active
    }

    /// Deliver with a global concurrency cap and up to 3 retries with
    /// exponential backoff (1s, 2s, 4s). `RecipientBlocked` flips the
    /// owner's `is_active` off without retrying; a later successful
    /// delivery flips it back on.
    async fn deliver(&self, owner: UserId, rendered: crate::render::RenderedNotification) {
        let _permit = self.delivery_semaphore.acquire().await;
        let mut attempt = 0u32;
        loop {
            match self.egress.send(owner, &rendered.body, rendered.markup.clone()).await {
                Ok(()) => {
                    if let Err(e) = self.store.set_user_active(owner, true) {
                        warn!(user_id = %owner, error = %e, "failed to mark user active after delivery");
                    }
                    info!(user_id = %owner, "notification delivered");
                    return;
                }
                Err(lw_egress::EgressError::RecipientBlocked) => {
                    warn!(user_id = %owner, "recipient blocked egress, marking inactive");
                    if let Err(e) = self.store.set_user_active(owner, false) {
                        warn!(user_id = %owner, error = %e, "failed to mark user inactive");
                    }
                    return;
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > DELIVERY_MAX_RETRIES {
                        warn!(user_id = %owner, error = %e, attempt, "delivery exhausted retries, dropping");
                        return;
                    }
                    let backoff = DELIVERY_BACKOFF_BASE_SECS << (attempt - 1);
                    warn!(user_id = %owner, error = %e, attempt, backoff, "transient delivery failure, retrying");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
            }
        }
    }

    /// Spawn the event-consumer loop: reads from `events_rx` and spawns an
    /// independent `process_event` task per event, so a slow delivery never
    /// delays the next event's ingestion.
    pub fn spawn_consumer(self: &Arc<Self>, mut events_rx: mpsc::Receiver<ChatEvent>) {
        let processor = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let processor = Arc::clone(&processor);
                tokio::spawn(async move { processor.process_event(event).await });
            }
        });
    }
}

impl CacheClearer for MessageProcessor {
    fn clear_caches(&self) {
        self.project_chat_cache.clear();
        self.tariff_cache.clear();
        debug!("processor caches cleared");
    }
}

/// Best-effort placeholder handle when a chat row has vanished from the
/// store between subscription and event delivery — used only for the
/// drop-and-stop path, never rendered.
fn placeholder_chat_handle(event: &ChatEvent) -> lw_core::types::ChatHandle {
    lw_core::types::ChatHandle::from(event.message.chat_numeric_id.to_string())
}
