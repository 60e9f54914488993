use std::fmt;

/// The four staged reminders C6 sends across a tariff's lifecycle (spec
/// §4.5). Forms half of the de-duplication key `(user_id, notification_type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// 23-24 hours left.
    Day,
    /// 0.5-1 hour left.
    Hour,
    /// Just crossed `end_date`.
    Expired,
    /// 24h after expiry, still unrenewed.
    PostExpired,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationKind::Day => "day",
            NotificationKind::Hour => "hour",
            NotificationKind::Expired => "expired",
            NotificationKind::PostExpired => "post_expired",
        };
        write!(f, "{s}")
    }
}
