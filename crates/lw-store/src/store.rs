use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, instrument};

use lw_core::types::{ChatHandle, ChatId, ProjectId, TariffPlanId, UserId};

use crate::db::{
    self, far_future_end_date, now_str, row_to_chat, row_to_payment, row_to_project,
    row_to_referral_link, row_to_tariff_plan, row_to_user, row_to_user_tariff,
};
use crate::error::{Result, StoreError};
use crate::types::*;

/// The single source of truth (C1). Wraps one SQLite connection behind a
/// `Mutex` — per-call transactions are short and never held across an
/// `.await`, so a plain mutex is sufficient (mirrors the teacher's
/// `SessionManager`/`MemoryManager` pattern). Callers on the async side are
/// expected to invoke these synchronous methods through
/// `tokio::task::spawn_blocking` to honour the non-blocking-I/O contract in
/// spec §5 — the store itself stays runtime-agnostic.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if absent) the SQLite file at `path` and initialise
    /// the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        db::init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // --- users ---------------------------------------------------------

    /// Return the existing user or create one, auto-assigning the zero
    /// tariff plan with an effectively infinite expiry.
    #[instrument(skip(self))]
    pub fn get_or_create_user(
        &self,
        id: UserId,
        username: Option<&str>,
        full_name: Option<&str>,
        referrer_code: Option<&str>,
    ) -> Result<User> {
        if let Some(existing) = self.get_user(id)? {
            return Ok(existing);
        }

        let conn = self.conn.lock().unwrap();
        let now = now_str();
        conn.execute(
            "INSERT INTO users (id, username, full_name, balance, is_admin, is_active,
                                 referrer_code, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, 0, 1, ?4, ?5, ?5)",
            params![id.0, username, full_name, referrer_code, now],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO user_tariffs
             (user_id, tariff_plan_id, start_date, end_date, is_active, free_extractions_used)
             VALUES (?1, ?2, ?3, ?4, 1, 0)",
            params![id.0, ZERO_TARIFF_PLAN_ID.0, now, far_future_end_date()],
        )?;
        info!(user_id = %id, "created user with zero tariff plan");
        drop(conn);
        self.get_user(id)?.ok_or(StoreError::UserNotFound(id))
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, username, full_name, balance, is_admin, is_active,
                    referrer_code, created_at, updated_at
             FROM users WHERE id = ?1",
            params![id.0],
            row_to_user,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Every user flagged `is_admin`, for broadcast notifications (spec
    /// §4.6: "every settled event notifies admins and the user via C8").
    pub fn list_admin_user_ids(&self) -> Result<Vec<UserId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM users WHERE is_admin = 1")?;
        let rows = stmt
            .query_map([], |r| r.get::<_, i64>(0).map(UserId))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn set_user_active(&self, id: UserId, active: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active as i64, now_str(), id.0],
        )?;
        if n == 0 {
            return Err(StoreError::UserNotFound(id));
        }
        Ok(())
    }

    pub fn set_user_admin(&self, id: UserId, is_admin: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE users SET is_admin = ?1, updated_at = ?2 WHERE id = ?3",
            params![is_admin as i64, now_str(), id.0],
        )?;
        if n == 0 {
            return Err(StoreError::UserNotFound(id));
        }
        Ok(())
    }

    /// Credit `amount` to the user's balance and append a `PaymentHistory`
    /// row, atomically.
    #[instrument(skip(self))]
    pub fn credit_balance(&self, id: UserId, amount: i64) -> Result<PaymentHistoryRow> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let n = tx.execute(
            "UPDATE users SET balance = balance + ?1, updated_at = ?2 WHERE id = ?3",
            params![amount, now_str(), id.0],
        )?;
        if n == 0 {
            return Err(StoreError::UserNotFound(id));
        }
        let now = now_str();
        tx.execute(
            "INSERT INTO payment_history (user_id, amount, created_at) VALUES (?1, ?2, ?3)",
            params![id.0, amount, now],
        )?;
        let payment_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(PaymentHistoryRow {
            id: payment_id,
            user_id: id,
            amount,
            created_at: now,
        })
    }

    /// Atomically debit `amount` from a user's balance, failing if
    /// insufficient. Used by billing adapter boundaries.
    pub fn try_debit_balance(&self, id: UserId, amount: i64) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let balance: i64 = tx
            .query_row("SELECT balance FROM users WHERE id = ?1", params![id.0], |r| r.get(0))
            .optional()?
            .ok_or(StoreError::UserNotFound(id))?;
        if balance < amount {
            return Err(StoreError::InsufficientBalance {
                user_id: id,
                balance,
                amount,
            });
        }
        tx.execute(
            "UPDATE users SET balance = balance - ?1, updated_at = ?2 WHERE id = ?3",
            params![amount, now_str(), id.0],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_payments(
        &self,
        user_id: UserId,
        before: Option<&str>,
        limit: u32,
    ) -> Result<Vec<PaymentHistoryRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, amount, created_at FROM payment_history
             WHERE user_id = ?1 AND (?2 IS NULL OR created_at < ?2)
             ORDER BY created_at DESC LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![user_id.0, before, limit], row_to_payment)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // --- referral links --------------------------------------------------

    pub fn create_referral_link(&self, code: &str) -> Result<ReferralLink> {
        let conn = self.conn.lock().unwrap();
        let now = now_str();
        conn.execute(
            "INSERT INTO referral_links (code, created_at) VALUES (?1, ?2)",
            params![code, now],
        )?;
        Ok(ReferralLink {
            code: code.to_string(),
            created_at: now,
        })
    }

    pub fn get_referral_link(&self, code: &str) -> Result<Option<ReferralLink>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT code, created_at FROM referral_links WHERE code = ?1",
            params![code],
            row_to_referral_link,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Delete a referral code, failing with `ReferralCodeInUse` while any
    /// user still references it.
    pub fn delete_referral_link(&self, code: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE referrer_code = ?1",
            params![code],
            |r| r.get(0),
        )?;
        if in_use > 0 {
            return Err(StoreError::ReferralCodeInUse(code.to_string()));
        }
        let n = conn.execute("DELETE FROM referral_links WHERE code = ?1", params![code])?;
        if n == 0 {
            return Err(StoreError::ReferralCodeNotFound(code.to_string()));
        }
        Ok(())
    }

    // --- tariff plans ------------------------------------------------------

    pub fn create_tariff_plan(
        &self,
        name: &str,
        price: i64,
        max_projects: i64,
        max_chats_per_project: i64,
        description: Option<&str>,
    ) -> Result<TariffPlan> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tariff_plans (name, price, max_projects, max_chats_per_project,
                                        is_active, description)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![name, price, max_projects, max_chats_per_project, description],
        )?;
        let id = TariffPlanId(conn.last_insert_rowid());
        Ok(TariffPlan {
            id,
            name: name.to_string(),
            price,
            max_projects,
            max_chats_per_project,
            is_active: true,
            description: description.map(String::from),
        })
    }

    pub fn get_tariff_plan(&self, id: TariffPlanId) -> Result<Option<TariffPlan>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, price, max_projects, max_chats_per_project, is_active, description
             FROM tariff_plans WHERE id = ?1",
            params![id.0],
            row_to_tariff_plan,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn list_active_tariff_plans(&self) -> Result<Vec<TariffPlan>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, price, max_projects, max_chats_per_project, is_active, description
             FROM tariff_plans WHERE is_active = 1 ORDER BY price",
        )?;
        let rows = stmt
            .query_map([], row_to_tariff_plan)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Delete a tariff plan, failing if referenced by any active assignment.
    pub fn delete_tariff_plan(&self, id: TariffPlanId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM user_tariffs WHERE tariff_plan_id = ?1 AND is_active = 1",
            params![id.0],
            |r| r.get(0),
        )?;
        if in_use > 0 {
            return Err(StoreError::TariffPlanInUse(id));
        }
        let n = conn.execute("DELETE FROM tariff_plans WHERE id = ?1", params![id.0])?;
        if n == 0 {
            return Err(StoreError::TariffPlanNotFound(id));
        }
        Ok(())
    }

    // --- user tariffs --------------------------------------------------

    /// Assign `tariff_plan_id` to `user_id` for `days` days from now.
    /// Exactly one row per user — upsert via `INSERT OR REPLACE`.
    #[instrument(skip(self))]
    pub fn assign_tariff(
        &self,
        user_id: UserId,
        tariff_plan_id: TariffPlanId,
        days: i64,
    ) -> Result<UserTariff> {
        let conn = self.conn.lock().unwrap();
        let start = now_str();
        let end = (chrono::Utc::now() + chrono::Duration::days(days)).to_rfc3339();
        conn.execute(
            "INSERT INTO user_tariffs
                (user_id, tariff_plan_id, start_date, end_date, is_active, free_extractions_used)
             VALUES (?1, ?2, ?3, ?4, 1, 0)
             ON CONFLICT(user_id) DO UPDATE SET
                tariff_plan_id = excluded.tariff_plan_id,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                is_active = 1",
            params![user_id.0, tariff_plan_id.0, start, end],
        )?;
        info!(user_id = %user_id, tariff_plan_id = %tariff_plan_id, days, "tariff assigned");
        Ok(UserTariff {
            user_id,
            tariff_plan_id,
            start_date: start,
            end_date: end,
            is_active: true,
            free_extractions_used: 0,
        })
    }

    /// Read a user's tariff, lazily clearing `is_active` if `end_date` has
    /// passed.
    pub fn get_user_tariff(&self, user_id: UserId) -> Result<Option<UserTariff>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT user_id, tariff_plan_id, start_date, end_date, is_active,
                        free_extractions_used
                 FROM user_tariffs WHERE user_id = ?1",
                params![user_id.0],
                row_to_user_tariff,
            )
            .optional()?;

        let Some(mut tariff) = row else {
            return Ok(None);
        };

        if tariff.is_active && tariff.end_date.as_str() <= now_str().as_str() {
            conn.execute(
                "UPDATE user_tariffs SET is_active = 0 WHERE user_id = ?1",
                params![user_id.0],
            )?;
            tariff.is_active = false;
        }

        Ok(Some(tariff))
    }

    /// All tariffs currently flagged active, for the tariff checker's scan
    ///. Does not apply the lazy-clear rewrite — the checker
    /// itself performs (and records) the deactivation per its own algorithm.
    pub fn list_active_user_tariffs(&self) -> Result<Vec<UserTariff>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, tariff_plan_id, start_date, end_date, is_active,
                    free_extractions_used
             FROM user_tariffs WHERE is_active = 1",
        )?;
        let rows = stmt
            .query_map([], row_to_user_tariff)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn deactivate_tariff(&self, user_id: UserId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE user_tariffs SET is_active = 0 WHERE user_id = ?1",
            params![user_id.0],
        )?;
        Ok(())
    }

    pub fn increment_free_extractions_used(&self, user_id: UserId) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE user_tariffs SET free_extractions_used = free_extractions_used + 1
             WHERE user_id = ?1",
            params![user_id.0],
        )?;
        conn.query_row(
            "SELECT free_extractions_used FROM user_tariffs WHERE user_id = ?1",
            params![user_id.0],
            |r| r.get(0),
        )
        .map_err(Into::into)
    }

    /// Pure read: is this user's tariff currently active? (spec §4.5 helper,
    /// never mutates — mirrors `get_user_tariff`'s lazy check without
    /// persisting the clear, for hot paths that can tolerate staleness
    /// within the same tick.)
    pub fn is_tariff_active(&self, user_id: UserId) -> Result<bool> {
        Ok(self
            .get_user_tariff(user_id)?
            .map(|t| t.is_active)
            .unwrap_or(false))
    }

    /// spec §4.5: active AND current project count under the plan's cap.
    pub fn can_create_project(&self, user_id: UserId) -> Result<bool> {
        let Some(tariff) = self.get_user_tariff(user_id)? else {
            return Ok(false);
        };
        if !tariff.is_active {
            return Ok(false);
        }
        let Some(plan) = self.get_tariff_plan(tariff.tariff_plan_id)? else {
            return Ok(false);
        };
        let current = self.count_projects_for_user(user_id)?;
        Ok(current < plan.max_projects)
    }

    /// spec §4.5: active AND current chat count in `project_id` under cap.
    pub fn can_add_chat(&self, user_id: UserId, project_id: ProjectId) -> Result<bool> {
        let Some(tariff) = self.get_user_tariff(user_id)? else {
            return Ok(false);
        };
        if !tariff.is_active {
            return Ok(false);
        }
        let Some(plan) = self.get_tariff_plan(tariff.tariff_plan_id)? else {
            return Ok(false);
        };
        let current = self.count_chats_for_project(project_id)?;
        Ok(current < plan.max_chats_per_project)
    }

    // --- projects --------------------------------------------------------

    pub fn create_project(
        &self,
        user_id: UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project> {
        let conn = self.conn.lock().unwrap();
        let now = now_str();
        conn.execute(
            "INSERT INTO projects (user_id, name, description, is_active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![user_id.0, name, description, now],
        )?;
        let id = ProjectId(conn.last_insert_rowid());
        Ok(Project {
            id,
            user_id,
            name: name.to_string(),
            description: description.map(String::from),
            is_active: true,
            created_at: now,
        })
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, user_id, name, description, is_active, created_at
             FROM projects WHERE id = ?1",
            params![id.0],
            row_to_project,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn list_projects_for_user(&self, user_id: UserId) -> Result<Vec<Project>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, description, is_active, created_at
             FROM projects WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![user_id.0], row_to_project)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Every active project across every user — the monitor engine's
    /// `restart_all_active` snapshot.
    pub fn list_all_active_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, description, is_active, created_at
             FROM projects WHERE is_active = 1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], row_to_project)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn count_projects_for_user(&self, user_id: UserId) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE user_id = ?1 AND is_active = 1",
            params![user_id.0],
            |r| r.get(0),
        )
        .map_err(Into::into)
    }

    /// Set a project's active flag. Per spec §4.2, disabling a project must
    /// stop every one of its chats first — callers (monitor engine) are
    /// responsible for that ordering; this is the raw flag flip.
    pub fn set_project_active(&self, id: ProjectId, active: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE projects SET is_active = ?1 WHERE id = ?2",
            params![active as i64, id.0],
        )?;
        if n == 0 {
            return Err(StoreError::ProjectNotFound(id));
        }
        Ok(())
    }

    /// Delete a project and cascade-delete its chats.
    pub fn delete_project(&self, id: ProjectId) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM monitored_chats WHERE project_id = ?1", params![id.0])?;
        let n = tx.execute("DELETE FROM projects WHERE id = ?1", params![id.0])?;
        tx.commit()?;
        if n == 0 {
            return Err(StoreError::ProjectNotFound(id));
        }
        Ok(())
    }

    /// Delete a user, cascading to their projects and chats.
    pub fn delete_user(&self, id: UserId) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let project_ids: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM projects WHERE user_id = ?1")?;
            stmt.query_map(params![id.0], |r| r.get(0))?
                .filter_map(|r| r.ok())
                .collect()
        };
        for pid in &project_ids {
            tx.execute("DELETE FROM monitored_chats WHERE project_id = ?1", params![pid])?;
        }
        tx.execute("DELETE FROM projects WHERE user_id = ?1", params![id.0])?;
        tx.execute("DELETE FROM user_tariffs WHERE user_id = ?1", params![id.0])?;
        let n = tx.execute("DELETE FROM users WHERE id = ?1", params![id.0])?;
        tx.commit()?;
        if n == 0 {
            return Err(StoreError::UserNotFound(id));
        }
        Ok(())
    }

    // --- monitored chats -------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn create_chat(
        &self,
        project_id: ProjectId,
        chat_handle: &ChatHandle,
        title: Option<&str>,
        chat_type: Option<&str>,
        keywords: Option<&str>,
        invite_hash: Option<&str>,
    ) -> Result<MonitoredChat> {
        let conn = self.conn.lock().unwrap();
        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM monitored_chats WHERE project_id = ?1 AND chat_handle = ?2",
            params![project_id.0, chat_handle.0],
            |r| r.get(0),
        )?;
        if existing > 0 {
            return Err(StoreError::DuplicateChat(chat_handle.0.clone()));
        }
        conn.execute(
            "INSERT INTO monitored_chats
                (project_id, chat_handle, title, chat_type, keywords, invite_hash, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
            params![project_id.0, chat_handle.0, title, chat_type, keywords, invite_hash],
        )?;
        let id = ChatId(conn.last_insert_rowid());
        Ok(MonitoredChat {
            id,
            project_id,
            chat_handle: chat_handle.clone(),
            title: title.map(String::from),
            chat_type: chat_type.map(String::from),
            keywords: keywords.map(String::from),
            invite_hash: invite_hash.map(String::from),
            is_active: true,
        })
    }

    pub fn get_chat(&self, id: ChatId) -> Result<Option<MonitoredChat>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, project_id, chat_handle, title, chat_type, keywords, invite_hash, is_active
             FROM monitored_chats WHERE id = ?1",
            params![id.0],
            row_to_chat,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn list_chats_for_project(
        &self,
        project_id: ProjectId,
        active_only: bool,
    ) -> Result<Vec<MonitoredChat>> {
        let conn = self.conn.lock().unwrap();
        let sql = if active_only {
            "SELECT id, project_id, chat_handle, title, chat_type, keywords, invite_hash, is_active
             FROM monitored_chats WHERE project_id = ?1 AND is_active = 1 ORDER BY id"
        } else {
            "SELECT id, project_id, chat_handle, title, chat_type, keywords, invite_hash, is_active
             FROM monitored_chats WHERE project_id = ?1 ORDER BY id"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![project_id.0], row_to_chat)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn count_chats_for_project(&self, project_id: ProjectId) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM monitored_chats WHERE project_id = ?1 AND is_active = 1",
            params![project_id.0],
            |r| r.get(0),
        )
        .map_err(Into::into)
    }

    pub fn set_chat_active(&self, id: ChatId, active: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE monitored_chats SET is_active = ?1 WHERE id = ?2",
            params![active as i64, id.0],
        )?;
        if n == 0 {
            return Err(StoreError::ChatNotFound(id));
        }
        Ok(())
    }

    pub fn delete_chat(&self, id: ChatId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM monitored_chats WHERE id = ?1", params![id.0])?;
        if n == 0 {
            return Err(StoreError::ChatNotFound(id));
        }
        Ok(())
    }
}
