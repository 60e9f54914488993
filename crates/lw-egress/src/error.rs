use thiserror::Error;

/// Delivery failure kinds the egress abstraction surfaces to its callers.
///
/// The distinction between [`EgressError::RecipientBlocked`] and
/// [`EgressError::Transient`] matters: C4 (message processor) flips a user's
/// `is_active` flag off only on the former.
#[derive(Debug, Error)]
pub enum EgressError {
    #[error("recipient has blocked the bot or deleted their account")]
    RecipientBlocked,

    #[error("transient delivery failure: {0}")]
    Transient(String),

    #[error("egress channel not configured")]
    NotConfigured,
}

pub type Result<T> = std::result::Result<T, EgressError>;
