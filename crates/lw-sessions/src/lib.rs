//! Owns the two session pools that multiplex authenticated platform
//! clients across tenant chats: `realtime` (long-lived,
//! shared across the monitor engine) and `history` (checked out per
//! extraction, one chat per checkout).

pub mod discovery;
pub mod error;
pub mod pool;
pub mod types;

pub use error::{Result, SessionPoolError};
pub use pool::{CheckedOutSession, SessionPool};
pub use types::{CredentialProfile, PoolKind, SessionDescriptor};
