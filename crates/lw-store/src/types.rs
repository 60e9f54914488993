use serde::{Deserialize, Serialize};

use lw_core::types::{ChatHandle, ChatId, ProjectId, TariffPlanId, UserId};

/// Reserved id of the distinguished zero tariff plan: auto-assigned
/// on user creation, `price = 0, max_projects = 1, max_chats_per_project = 1`.
pub const ZERO_TARIFF_PLAN_ID: TariffPlanId = TariffPlanId(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub balance: i64,
    pub is_admin: bool,
    pub is_active: bool,
    pub referrer_code: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralLink {
    pub code: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistoryRow {
    pub id: i64,
    pub user_id: UserId,
    pub amount: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffPlan {
    pub id: TariffPlanId,
    pub name: String,
    pub price: i64,
    pub max_projects: i64,
    pub max_chats_per_project: i64,
    pub is_active: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTariff {
    pub user_id: UserId,
    pub tariff_plan_id: TariffPlanId,
    pub start_date: String,
    pub end_date: String,
    pub is_active: bool,
    pub free_extractions_used: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredChat {
    pub id: ChatId,
    pub project_id: ProjectId,
    pub chat_handle: ChatHandle,
    pub title: Option<String>,
    pub chat_type: Option<String>,
    pub keywords: Option<String>,
    pub invite_hash: Option<String>,
    pub is_active: bool,
}
