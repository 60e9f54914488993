use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use lw_core::config::{MAINTENANCE_CANCEL_TIMEOUT_MS, MAINTENANCE_TICK_SECS};
use lw_core::types::{ChatId, ProjectId};
use lw_platform::PlatformMessage;
use lw_sessions::SessionPool;
use lw_store::Store;

use crate::error::{MonitorError, Result};
use crate::types::{CacheClearer, ChatEvent, ChatState};

struct EngineState {
    chats: HashMap<ChatId, ChatState>,
    /// Platform numeric chat id -> routing context, used to demux the
    /// shared per-session message stream.
    numeric_index: HashMap<i64, (ChatId, ProjectId, Option<String>)>,
    /// Session names already being drained by a demux task — the platform
    /// abstraction supports exactly one `message_stream()` subscription per
    /// connected session.
    streamed_sessions: HashSet<String>,
}

/// Translates the persistent model (active projects, active chats) into
/// live event subscriptions on the realtime session pool and back (spec
/// §4.2, C3).
pub struct MonitorEngine {
    store: Arc<Store>,
    pool: Arc<SessionPool>,
    events_tx: mpsc::Sender<ChatEvent>,
    cache_clearer: Option<Arc<dyn CacheClearer>>,
    reload_interval: Duration,
    state: Mutex<EngineState>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    maintenance_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorEngine {
    pub fn new(
        store: Arc<Store>,
        pool: Arc<SessionPool>,
        events_tx: mpsc::Sender<ChatEvent>,
        cache_clearer: Option<Arc<dyn CacheClearer>>,
        reload_interval: Duration,
    ) -> Arc<Self> {
        let (stop_tx, stop_rx) = watch::channel(false);
        Arc::new(Self {
            store,
            pool,
            events_tx,
            cache_clearer,
            reload_interval,
            state: Mutex::new(EngineState {
                chats: HashMap::new(),
                numeric_index: HashMap::new(),
                streamed_sessions: HashSet::new(),
            }),
            stop_tx,
            stop_rx,
            maintenance_handle: Mutex::new(None),
        })
    }

    pub(crate) fn chat_state(&self, chat_id: ChatId) -> ChatState {
        self.state
            .lock()
            .unwrap()
            .chats
            .get(&chat_id)
            .copied()
            .unwrap_or(ChatState::Disabled)
    }

    fn set_chat_state(&self, chat_id: ChatId, new_state: ChatState) {
        self.state.lock().unwrap().chats.insert(chat_id, new_state);
    }

    /// Idempotent: if already SUBSCRIBED, re-ensures membership in the
    /// active-projects index but performs no platform operations (spec
    /// §4.2 `start_chat`).
    #[instrument(skip(self))]
    pub async fn start_chat(self: &Arc<Self>, chat_id: ChatId, project_id: ProjectId) -> Result<()> {
        if self.chat_state(chat_id) == ChatState::Subscribed {
            return Ok(());
        }
        self.set_chat_state(chat_id, ChatState::Joining);

        let chat = self
            .store
            .get_chat(chat_id)?
            .ok_or(MonitorError::ChatNotFound(chat_id))?;

        let (client, session_name) = self.pool.choose_for_chat(chat_id, &chat.chat_handle).await?;

        let join_result = if chat.chat_handle.is_username() {
            client.join_chat(&chat.chat_handle, None).await
        } else if let Some(invite_hash) = chat.invite_hash.as_deref() {
            client.join_chat(&chat.chat_handle, Some(invite_hash)).await
        } else {
            Err(lw_platform::PlatformError::JoinFailed {
                handle: chat.chat_handle.to_string(),
                reason: "non-username chat with no invite hash on record".to_string(),
            })
        };

        let Ok(chat_info) = join_result else {
            let reason = join_result.unwrap_err().to_string();
            warn!(chat_id = %chat_id, reason = %reason, "join failed, staying disabled for this tick");
            self.pool.unbind_chat(chat_id).await;
            self.set_chat_state(chat_id, ChatState::Disabled);
            return Err(MonitorError::JoinFailed { chat_id, reason });
        };

        {
            let mut state = self.state.lock().unwrap();
            state
                .numeric_index
                .insert(chat_info.numeric_id, (chat_id, project_id, chat.keywords.clone()));
            if state.streamed_sessions.insert(session_name.clone()) {
                drop(state);
                self.spawn_demux(session_name.clone(), client.message_stream());
            }
        }

        self.set_chat_state(chat_id, ChatState::Subscribed);
        info!(chat_id = %chat_id, project_id = %project_id, session = %session_name, "chat subscribed");
        Ok(())
    }

    /// Reads one session's shared message stream for its lifetime and
    /// routes each message to the processor via `events_tx`, resolving the
    /// routing context from the numeric-chat index: one `new-message`
    /// handler per client, demultiplexed by chat.
    fn spawn_demux(
        self: &Arc<Self>,
        session_name: String,
        mut stream: futures_util::stream::BoxStream<'static, PlatformMessage>,
    ) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            use futures_util::StreamExt;
            debug!(session = %session_name, "demux task started");
            while let Some(message) = stream.next().await {
                let ctx = {
                    let state = engine.state.lock().unwrap();
                    state.numeric_index.get(&message.chat_numeric_id).cloned()
                };
                let Some((chat_id, project_id, keywords)) = ctx else {
                    continue;
                };
                let event = ChatEvent {
                    project_id,
                    chat_id,
                    keywords,
                    message,
                };
                if engine.events_tx.try_send(event).is_err() {
                    warn!(session = %session_name, "processor event channel full or closed, dropping message");
                }
            }
            debug!(session = %session_name, "demux task ended");
        });
    }

    /// Idempotent: transitions to DISABLED and updates indices.
    #[instrument(skip(self))]
    pub async fn stop_chat(&self, chat_id: ChatId) {
        if self.chat_state(chat_id) == ChatState::Disabled {
            return;
        }
        self.set_chat_state(chat_id, ChatState::Draining);
        self.pool.unbind_chat(chat_id).await;
        self.state
            .lock()
            .unwrap()
            .numeric_index
            .retain(|_, (id, _, _)| *id != chat_id);
        self.set_chat_state(chat_id, ChatState::Disabled);
        info!(chat_id = %chat_id, "chat stopped");
    }

    /// Snapshot active chats for `project_id` and start each. Returns the
    /// count successfully subscribed.
    #[instrument(skip(self))]
    pub async fn start_project(self: &Arc<Self>, project_id: ProjectId) -> Result<usize> {
        let chats = self.store.list_chats_for_project(project_id, true)?;
        let mut started = 0;
        for chat in chats {
            match self.start_chat(chat.id, project_id).await {
                Ok(()) => started += 1,
                Err(e) => warn!(chat_id = %chat.id, error = %e, "chat failed to start, retried on next maintenance tick"),
            }
        }
        Ok(started)
    }

    /// Stop every chat in the project.
    #[instrument(skip(self))]
    pub async fn stop_project(&self, project_id: ProjectId) -> Result<()> {
        let chats = self.store.list_chats_for_project(project_id, false)?;
        for chat in chats {
            self.stop_chat(chat.id).await;
        }
        Ok(())
    }

    /// Full resync: stop everything cleanly, reload active projects,
    /// re-subscribe. Used at boot and by periodic self-heal.
    #[instrument(skip(self))]
    pub async fn restart_all_active(self: &Arc<Self>) {
        let tracked: Vec<ChatId> = self.state.lock().unwrap().chats.keys().copied().collect();
        for chat_id in tracked {
            self.stop_chat(chat_id).await;
        }

        let projects = match self.store.list_all_active_projects() {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "restart_all_active: failed to load active projects");
                return;
            }
        };

        for project in projects {
            if let Err(e) = self.start_project(project.id).await {
                error!(project_id = %project.id, error = %e, "restart_all_active: project failed to start");
            }
        }
    }

    /// Spawn the maintenance loop: every `reload_interval` (checked at
    /// `MAINTENANCE_TICK_SECS` granularity so the stop flag is observed
    /// promptly) clears processor caches and runs `restart_all_active`.
    pub fn spawn_maintenance(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        let mut stop_rx = self.stop_rx.clone();
        let handle = tokio::spawn(async move {
            let mut last_reload = Instant::now();
            let mut ticker = tokio::time::interval(Duration::from_secs(MAINTENANCE_TICK_SECS));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if last_reload.elapsed() >= engine.reload_interval {
                            info!("maintenance tick: reload interval elapsed, resyncing");
                            if let Some(clearer) = &engine.cache_clearer {
                                clearer.clear_caches();
                            }
                            engine.restart_all_active().await;
                            last_reload = Instant::now();
                        }
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            info!("maintenance loop observed stop flag");
                            break;
                        }
                    }
                }
            }
        });
        *self.maintenance_handle.lock().unwrap() = Some(handle);
    }

    /// Cancellation sequence: set flag; cancel maintenance loop
    /// and await with a bounded timeout; disconnect every active session
    /// via the pool's own timeout-guarded shutdown; clear caches.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let _ = self.stop_tx.send(true);

        let handle = self.maintenance_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let timeout = Duration::from_millis(MAINTENANCE_CANCEL_TIMEOUT_MS);
            if tokio::time::timeout(timeout, handle).await.is_err() {
                warn!("maintenance loop did not observe stop flag within timeout");
            }
        }

        let tracked: Vec<ChatId> = self.state.lock().unwrap().chats.keys().copied().collect();
        for chat_id in tracked {
            self.stop_chat(chat_id).await;
        }

        self.pool.shutdown().await;

        if let Some(clearer) = &self.cache_clearer {
            clearer.clear_caches();
        }
        info!("monitor engine shut down");
    }
}
