use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::error::Result;
use crate::types::*;
use lw_core::types::{ChatId, ProjectId, TariffPlanId, UserId};

/// Initialise every table, indexes, and the distinguished zero tariff plan.
/// Idempotent — safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    create_users_table(conn)?;
    create_referral_links_table(conn)?;
    create_payment_history_table(conn)?;
    create_tariff_plans_table(conn)?;
    create_user_tariffs_table(conn)?;
    create_projects_table(conn)?;
    create_monitored_chats_table(conn)?;
    seed_zero_plan(conn)?;
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY NOT NULL,
            username        TEXT,
            full_name       TEXT,
            balance         INTEGER NOT NULL DEFAULT 0,
            is_admin        INTEGER NOT NULL DEFAULT 0,
            is_active       INTEGER NOT NULL DEFAULT 1,
            referrer_code   TEXT REFERENCES referral_links(code),
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn create_referral_links_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS referral_links (
            code        TEXT PRIMARY KEY NOT NULL,
            created_at  TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn create_payment_history_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS payment_history (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            amount      INTEGER NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_payment_history_user
            ON payment_history (user_id, created_at DESC);",
    )?;
    Ok(())
}

fn create_tariff_plans_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tariff_plans (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            name                    TEXT NOT NULL,
            price                   INTEGER NOT NULL,
            max_projects            INTEGER NOT NULL,
            max_chats_per_project   INTEGER NOT NULL,
            is_active               INTEGER NOT NULL DEFAULT 1,
            description             TEXT
        );",
    )?;
    Ok(())
}

fn create_user_tariffs_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_tariffs (
            user_id                 INTEGER PRIMARY KEY NOT NULL REFERENCES users(id),
            tariff_plan_id          INTEGER NOT NULL REFERENCES tariff_plans(id),
            start_date              TEXT NOT NULL,
            end_date                TEXT NOT NULL,
            is_active               INTEGER NOT NULL DEFAULT 1,
            free_extractions_used   INTEGER NOT NULL DEFAULT 0
        );",
    )?;
    Ok(())
}

fn create_projects_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS projects (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            name        TEXT NOT NULL,
            description TEXT,
            is_active   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_projects_user ON projects (user_id);",
    )?;
    Ok(())
}

fn create_monitored_chats_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS monitored_chats (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id   INTEGER NOT NULL REFERENCES projects(id),
            chat_handle  TEXT NOT NULL,
            title        TEXT,
            chat_type    TEXT,
            keywords     TEXT,
            invite_hash  TEXT,
            is_active    INTEGER NOT NULL DEFAULT 1,
            UNIQUE(project_id, chat_handle)
        );
        CREATE INDEX IF NOT EXISTS idx_chats_project ON monitored_chats (project_id);",
    )?;
    Ok(())
}

/// Insert the distinguished zero plan (id 1) if it is not already present.
/// `max_projects = 1, max_chats_per_project = 1, price = 0` per spec §3.
fn seed_zero_plan(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO tariff_plans
         (id, name, price, max_projects, max_chats_per_project, is_active, description)
         VALUES (1, 'zero', 0, 1, 1, 1, 'Free tier, auto-assigned on signup')",
        [],
    )?;
    Ok(())
}

/// Expiry used for the zero plan's `UserTariff` row — effectively infinite
/// (spec §3: "auto-assigned on user creation with an effectively infinite
/// expiry").
pub fn far_future_end_date() -> String {
    (Utc::now() + Duration::days(365 * 100)).to_rfc3339()
}

pub fn now_str() -> String {
    Utc::now().to_rfc3339()
}

// --- row mappers -----------------------------------------------------------

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        full_name: row.get(2)?,
        balance: row.get(3)?,
        is_admin: row.get::<_, i64>(4)? != 0,
        is_active: row.get::<_, i64>(5)? != 0,
        referrer_code: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub(crate) fn row_to_referral_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReferralLink> {
    Ok(ReferralLink {
        code: row.get(0)?,
        created_at: row.get(1)?,
    })
}

pub(crate) fn row_to_payment(row: &rusqlite::Row<'_>) -> rusqlite::Result<PaymentHistoryRow> {
    Ok(PaymentHistoryRow {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        amount: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) fn row_to_tariff_plan(row: &rusqlite::Row<'_>) -> rusqlite::Result<TariffPlan> {
    Ok(TariffPlan {
        id: TariffPlanId(row.get(0)?),
        name: row.get(1)?,
        price: row.get(2)?,
        max_projects: row.get(3)?,
        max_chats_per_project: row.get(4)?,
        is_active: row.get::<_, i64>(5)? != 0,
        description: row.get(6)?,
    })
}

pub(crate) fn row_to_user_tariff(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserTariff> {
    Ok(UserTariff {
        user_id: UserId(row.get(0)?),
        tariff_plan_id: TariffPlanId(row.get(1)?),
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        is_active: row.get::<_, i64>(4)? != 0,
        free_extractions_used: row.get(5)?,
    })
}

pub(crate) fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ProjectId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        name: row.get(2)?,
        description: row.get(3)?,
        is_active: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
    })
}

pub(crate) fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<MonitoredChat> {
    Ok(MonitoredChat {
        id: ChatId(row.get(0)?),
        project_id: ProjectId(row.get(1)?),
        chat_handle: row.get::<_, String>(2)?.into(),
        title: row.get(3)?,
        chat_type: row.get(4)?,
        keywords: row.get(5)?,
        invite_hash: row.get(6)?,
        is_active: row.get::<_, i64>(7)? != 0,
    })
}
