use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use lw_core::types::{ChatHandle, ChatId};
use lw_platform::{Credential, PlatformSession, PlatformSessionFactory};

use crate::discovery::discover_credentials;
use crate::error::{Result, SessionPoolError};
use crate::types::{ActiveBinding, PoolKind, SessionDescriptor};

const DISCONNECT_TIMEOUT: Duration = Duration::from_millis(lw_core::config::SESSION_DISCONNECT_TIMEOUT_MS);

struct ActiveSession {
    client: Arc<dyn PlatformSession>,
    binding: ActiveBinding,
}

/// A session handed out by `acquire_transient`. Must be returned through
/// `release_transient` — dropping it without releasing leaves the
/// credential marked in-use until the pool is rebuilt.
pub struct CheckedOutSession {
    pub name: String,
    pub client: Arc<dyn PlatformSession>,
}

/// Owns a set of authenticated long-lived clients to the messaging
/// platform, partitions monitored chats across them, and exposes
/// checkout for short-lived operations.
///
/// Two instances exist in the running system, one per [`PoolKind`], built
/// over disjoint credential directories.
pub struct SessionPool {
    kind: PoolKind,
    dir: PathBuf,
    factory: Arc<dyn PlatformSessionFactory>,
    credentials: Mutex<Vec<Credential>>,
    in_use: Mutex<Vec<String>>,
    active: Mutex<HashMap<String, ActiveSession>>,
    chat_to_session: Mutex<HashMap<ChatId, String>>,
}

impl SessionPool {
    pub fn new(kind: PoolKind, dir: PathBuf, factory: Arc<dyn PlatformSessionFactory>) -> Self {
        Self {
            kind,
            dir,
            factory,
            credentials: Mutex::new(Vec::new()),
            in_use: Mutex::new(Vec::new()),
            active: Mutex::new(HashMap::new()),
            chat_to_session: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    /// Rescan the credential directory. Safe to call repeatedly; replaces
    /// the candidate set without disturbing currently active clients.
    #[instrument(skip(self))]
    pub fn refresh_credentials(&self) -> Result<()> {
        let found = discover_credentials(&self.dir).map_err(SessionPoolError::Io)?;
        info!(pool = ?self.kind, count = found.len(), "discovered session credentials");
        *self.credentials.lock().unwrap() = found;
        Ok(())
    }

    /// Acquire a client not currently marked in-use, connect it, and
    /// verify authorization. On failure the credential is removed from
    /// the candidate set for this call and the next is tried. Ordering is
    /// randomised to spread load.
    #[instrument(skip(self))]
    pub async fn acquire_transient(&self) -> Result<CheckedOutSession> {
        let mut candidates: Vec<Credential> = {
            let creds = self.credentials.lock().unwrap();
            let in_use = self.in_use.lock().unwrap();
            creds
                .iter()
                .filter(|c| !in_use.contains(&c.name))
                .cloned()
                .collect()
        };
        candidates.shuffle(&mut rand::thread_rng());

        for credential in candidates {
            match self.factory.connect(&credential).await {
                Ok(client) => {
                    let client: Arc<dyn PlatformSession> = Arc::from(client);
                    if !client.is_authorized().await {
                        warn!(name = %credential.name, "session connected but not authorized, skipping");
                        continue;
                    }
                    self.in_use.lock().unwrap().push(credential.name.clone());
                    return Ok(CheckedOutSession {
                        name: credential.name,
                        client,
                    });
                }
                Err(e) => {
                    warn!(name = %credential.name, error = %e, "failed to connect session, trying next candidate");
                    continue;
                }
            }
        }

        Err(SessionPoolError::NoSessionAvailable)
    }

    /// Disconnect and unmark a transient session acquired via
    /// `acquire_transient`.
    #[instrument(skip(self, session))]
    pub async fn release_transient(&self, session: CheckedOutSession) {
        session.client.disconnect().await;
        self.in_use.lock().unwrap().retain(|n| n != &session.name);
    }

    /// Return the client bound to `chat_id`, creating a binding if none
    /// exists yet: fill every idle credential before stacking a second chat
    /// onto a session that already has one bound, then fall back to the
    /// active client with the fewest bound chats (spec §4.1's least-loaded
    /// policy / §8's load-balance property).
    #[instrument(skip(self))]
    pub async fn choose_for_chat(
        &self,
        chat_id: ChatId,
        handle: &ChatHandle,
    ) -> Result<(Arc<dyn PlatformSession>, String)> {
        if let Some(name) = self.chat_to_session.lock().unwrap().get(&chat_id).cloned() {
            if let Some(active) = self.active.lock().unwrap().get(&name) {
                return Ok((active.client.clone(), name));
            }
        }

        let least_loaded = self.least_loaded_active();
        let idle_candidate = self.idle_credential();

        let should_promote = idle_candidate.is_some()
            && least_loaded
                .as_ref()
                .map(|name| self.bound_count(name) >= 1)
                .unwrap_or(true);

        if !should_promote {
            if let Some(name) = least_loaded {
                self.bind_chat(&name, chat_id);
                let client = self.active.lock().unwrap().get(&name).unwrap().client.clone();
                return Ok((client, name));
            }
        }

        let candidate = idle_candidate.ok_or(SessionPoolError::NoSessionAvailable)?;

        let client = self.factory.connect(&candidate).await?;
        let client: Arc<dyn PlatformSession> = Arc::from(client);
        if !client.is_authorized().await {
            return Err(SessionPoolError::NoSessionAvailable);
        }
        info!(name = %candidate.name, chat_id = %chat_id, handle = %handle, "promoted credential to active session");

        self.active.lock().unwrap().insert(
            candidate.name.clone(),
            ActiveSession {
                client: client.clone(),
                binding: ActiveBinding::default(),
            },
        );
        self.bind_chat(&candidate.name, chat_id);
        Ok((client, candidate.name))
    }

    fn least_loaded_active(&self) -> Option<String> {
        self.active
            .lock()
            .unwrap()
            .iter()
            .min_by_key(|(_, session)| session.binding.bound_chats.len())
            .map(|(name, _)| name.clone())
    }

    fn bound_count(&self, session_name: &str) -> usize {
        self.active
            .lock()
            .unwrap()
            .get(session_name)
            .map(|s| s.binding.bound_chats.len())
            .unwrap_or(0)
    }

    /// A credential not yet promoted to an active session.
    fn idle_credential(&self) -> Option<Credential> {
        let creds = self.credentials.lock().unwrap();
        let active = self.active.lock().unwrap();
        creds.iter().find(|c| !active.contains_key(&c.name)).cloned()
    }

    fn bind_chat(&self, session_name: &str, chat_id: ChatId) {
        if let Some(active) = self.active.lock().unwrap().get_mut(session_name) {
            if !active.binding.bound_chats.contains(&chat_id) {
                active.binding.bound_chats.push(chat_id);
            }
        }
        self.chat_to_session
            .lock()
            .unwrap()
            .insert(chat_id, session_name.to_string());
    }

    /// Remove a chat's binding (monitor's DRAINING transition). If the
    /// owning session now binds zero chats it is released.
    #[instrument(skip(self))]
    pub async fn unbind_chat(&self, chat_id: ChatId) {
        let session_name = self.chat_to_session.lock().unwrap().remove(&chat_id);
        let Some(session_name) = session_name else {
            return;
        };

        let now_empty = {
            let mut active = self.active.lock().unwrap();
            if let Some(session) = active.get_mut(&session_name) {
                session.binding.bound_chats.retain(|c| *c != chat_id);
                session.binding.bound_chats.is_empty()
            } else {
                false
            }
        };

        if now_empty {
            self.release_active(&session_name).await;
        }
    }

    async fn release_active(&self, name: &str) {
        let client = self.active.lock().unwrap().remove(name).map(|s| s.client);
        if let Some(client) = client {
            client.disconnect().await;
            info!(name = %name, "released active session with zero bound chats");
        }
    }

    /// Descriptor tuples for admin surfaces.
    pub fn list_info(&self) -> Vec<SessionDescriptor> {
        let credentials = self.credentials.lock().unwrap();
        let active = self.active.lock().unwrap();
        let in_use = self.in_use.lock().unwrap();

        credentials
            .iter()
            .map(|c| {
                if let Some(session) = active.get(&c.name) {
                    SessionDescriptor {
                        name: c.name.clone(),
                        is_active: true,
                        is_valid: true,
                        bound_chats: session.binding.bound_chats.len(),
                        last_seen: None,
                        skip_reason: None,
                    }
                } else {
                    SessionDescriptor {
                        name: c.name.clone(),
                        is_active: false,
                        is_valid: true,
                        bound_chats: 0,
                        last_seen: None,
                        skip_reason: if in_use.contains(&c.name) {
                            Some("checked out transiently".to_string())
                        } else {
                            None
                        },
                    }
                }
            })
            .collect()
    }

    /// Disconnect every active client with a hard per-client timeout;
    /// clear all bookkeeping regardless of individual outcomes (spec
    /// §4.1, §5 cancellation contract).
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let sessions: Vec<(String, Arc<dyn PlatformSession>)> = {
            let active = self.active.lock().unwrap();
            active
                .iter()
                .map(|(name, s)| (name.clone(), s.client.clone()))
                .collect()
        };

        for (name, client) in sessions {
            match timeout(DISCONNECT_TIMEOUT, client.disconnect()).await {
                Ok(()) => info!(name = %name, "session disconnected during shutdown"),
                Err(_) => warn!(name = %name, "session disconnect timed out, force-closing bookkeeping"),
            }
        }

        self.active.lock().unwrap().clear();
        self.chat_to_session.lock().unwrap().clear();
        self.in_use.lock().unwrap().clear();
    }

    /// True if at least one credential is usable.
    pub fn is_healthy(&self) -> bool {
        !self.credentials.lock().unwrap().is_empty()
    }

    /// Mark every chat bound to `credential_name` as orphaned by dropping
    /// the session from `active` bookkeeping; returns the chat ids that
    /// need re-binding on the next maintenance tick. A chat-bound client
    /// going unusable orphans its chats.
    #[instrument(skip(self))]
    pub fn orphan_session(&self, credential_name: &str) -> Vec<ChatId> {
        let orphaned = {
            let mut active = self.active.lock().unwrap();
            active
                .remove(credential_name)
                .map(|s| s.binding.bound_chats)
                .unwrap_or_default()
        };
        let mut chat_to_session = self.chat_to_session.lock().unwrap();
        for chat_id in &orphaned {
            chat_to_session.remove(chat_id);
        }
        orphaned
    }
}
