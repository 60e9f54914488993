use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("user not found: {0}")]
    UserNotFound(lw_core::types::UserId),

    #[error("project not found: {0}")]
    ProjectNotFound(lw_core::types::ProjectId),

    #[error("chat not found: {0}")]
    ChatNotFound(lw_core::types::ChatId),

    #[error("tariff plan not found: {0}")]
    TariffPlanNotFound(lw_core::types::TariffPlanId),

    #[error("referral code not found: {0}")]
    ReferralCodeNotFound(String),

    #[error("referral code still referenced by at least one user: {0}")]
    ReferralCodeInUse(String),

    #[error("tariff plan still referenced by an active assignment: {0}")]
    TariffPlanInUse(lw_core::types::TariffPlanId),

    #[error("chat already exists for this project: {0}")]
    DuplicateChat(String),

    #[error("insufficient balance for user {user_id}: have {balance}, need {amount}")]
    InsufficientBalance {
        user_id: lw_core::types::UserId,
        balance: i64,
        amount: i64,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
