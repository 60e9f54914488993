use std::fmt;

use serde::{Deserialize, Serialize};

/// A tenant's messaging-platform identity. Globally unique, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Primary key of a `Project` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub i64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProjectId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Primary key of a `MonitoredChat` row. NOT the platform's own chat id —
/// see [`ChatHandle`] for the platform-facing address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Primary key of a `TariffPlan` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TariffPlanId(pub i64);

impl fmt::Display for TariffPlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TariffPlanId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// The address of a chat on the messaging platform: either `@handle` or a
/// signed numeric id. Opaque to every component except the platform adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatHandle(pub String);

impl ChatHandle {
    pub fn is_username(&self) -> bool {
        self.0.starts_with('@')
    }
}

impl fmt::Display for ChatHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChatHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ChatHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}
