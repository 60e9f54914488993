use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use tokio::sync::watch;
use tracing::{error, info, warn};

use lw_core::config::{TARIFF_CHECK_INTERVAL_SECS, TARIFF_DEDUP_WINDOW_SECS};
use lw_core::types::{ProjectId, UserId};
use lw_egress::Egress;
use lw_store::Store;

use crate::types::NotificationKind;

/// Enforces time-bounded tariff entitlements and keeps tenants informed of
/// upcoming and past expiry.
///
/// Runs as a single long-lived task: an `interval` fires `tick()` until a
/// `watch::Receiver<bool>` reports shutdown.
pub struct TariffChecker {
    store: Arc<Store>,
    egress: Arc<dyn Egress>,
    sent: DashSet<(UserId, NotificationKind)>,
    dedup_reset_at: std::sync::Mutex<DateTime<Utc>>,
    recently_expired: DashMap<UserId, DateTime<Utc>>,
}

impl TariffChecker {
    pub fn new(store: Arc<Store>, egress: Arc<dyn Egress>) -> Arc<Self> {
        Arc::new(Self {
            store,
            egress,
            sent: DashSet::new(),
            dedup_reset_at: std::sync::Mutex::new(Utc::now()),
            recently_expired: DashMap::new(),
        })
    }

    /// Pure read: is this user's tariff currently active? Re-exposed here
    /// so callers don't need to depend on `lw-store` directly.
    pub fn is_tariff_active(&self, user_id: UserId) -> bool {
        self.store.is_tariff_active(user_id).unwrap_or(false)
    }

    pub fn can_create_project(&self, user_id: UserId) -> bool {
        self.store.can_create_project(user_id).unwrap_or(false)
    }

    pub fn can_add_chat(&self, user_id: UserId, project_id: ProjectId) -> bool {
        self.store.can_add_chat(user_id, project_id).unwrap_or(false)
    }

    /// Pure read: how many free extractions `user_id` has left against
    /// `free_limit` (the configured `free_comments_limit`). A user with no
    /// tariff row yet has the full quota available.
    pub fn remaining_free_extractions(&self, user_id: UserId, free_limit: i64) -> i64 {
        let used = self
            .store
            .get_user_tariff(user_id)
            .ok()
            .flatten()
            .map(|t| t.free_extractions_used)
            .unwrap_or(0);
        (free_limit - used).max(0)
    }

    /// Drive the periodic scan until `shutdown` reports `true`.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("tariff checker started");
        let mut interval = tokio::time::interval(Duration::from_secs(TARIFF_CHECK_INTERVAL_SECS as u64));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let started = tokio::time::Instant::now();
                    self.tick().await;
                    if started.elapsed() > Duration::from_secs(TARIFF_CHECK_INTERVAL_SECS as u64) {
                        warn!("tariff check loop overran its interval");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("tariff checker shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub(crate) async fn tick(self: &Arc<Self>) {
        self.maybe_reset_dedup_window();

        let tariffs = match self.store.list_active_user_tariffs() {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "tariff check: failed to list active tariffs");
                return;
            }
        };

        let now = Utc::now();
        for tariff in tariffs {
            let end_date = match DateTime::parse_from_rfc3339(&tariff.end_date) {
                Ok(dt) => dt.with_timezone(&Utc),
                Err(e) => {
                    warn!(user_id = %tariff.user_id, error = %e, "unparseable tariff end_date, skipping");
                    continue;
                }
            };

            if end_date <= now {
                if let Err(e) = self.store.deactivate_tariff(tariff.user_id) {
                    warn!(user_id = %tariff.user_id, error = %e, "failed to deactivate expired tariff");
                }
                self.recently_expired.insert(tariff.user_id, now);
                self.notify_once(
                    tariff.user_id,
                    NotificationKind::Expired,
                    "Your tariff has ended — full notifications are paused until you renew.",
                )
                .await;
                continue;
            }

            let hours_left = (end_date - now).num_seconds() as f64 / 3600.0;
            if (23.0..=24.0).contains(&hours_left) {
                self.notify_once(
                    tariff.user_id,
                    NotificationKind::Day,
                    "Your tariff expires in about one day.",
                )
                .await;
            } else if (0.5..=1.0).contains(&hours_left) {
                self.notify_once(
                    tariff.user_id,
                    NotificationKind::Hour,
                    "Your tariff expires in about one hour.",
                )
                .await;
            }
        }

        self.sweep_post_expired(now).await;
    }

    async fn sweep_post_expired(self: &Arc<Self>, now: DateTime<Utc>) {
        let due: Vec<UserId> = self
            .recently_expired
            .iter()
            .filter(|entry| (now - *entry.value()).num_seconds() >= TARIFF_DEDUP_WINDOW_SECS)
            .map(|entry| *entry.key())
            .collect();

        for user_id in due {
            self.notify_once(
                user_id,
                NotificationKind::PostExpired,
                "You're missing leads — reactivate your tariff to resume notifications.",
            )
            .await;
            self.recently_expired.remove(&user_id);
        }
    }

    /// Send `body` to `user_id` iff `(user_id, kind)` hasn't been sent this
    /// de-duplication window, then mark it sent regardless of delivery
    /// outcome — a transient egress failure doesn't warrant a resend storm.
    async fn notify_once(&self, user_id: UserId, kind: NotificationKind, body: &str) {
        if !self.sent.insert((user_id, kind)) {
            return;
        }
        if let Err(e) = self.egress.send(user_id, body, None).await {
            warn!(user_id = %user_id, kind = %kind, error = %e, "tariff notification delivery failed");
        } else {
            info!(user_id = %user_id, kind = %kind, "tariff notification sent");
        }
    }

    fn maybe_reset_dedup_window(&self) {
        let mut reset_at = self.dedup_reset_at.lock().unwrap();
        let now = Utc::now();
        if (now - *reset_at).num_seconds() >= TARIFF_DEDUP_WINDOW_SECS {
            self.sent.clear();
            *reset_at = now;
            info!("tariff notification de-duplication window reset");
        }
    }
}
