//! The one concrete platform and egress adapter this workspace ships (spec
//! §1, §4.1, §4.8), backed by the Telegram Bot API via `teloxide`.

pub mod convert;
pub mod egress;
pub mod error;
pub mod session;

pub use egress::TelegramEgress;
pub use error::TelegramError;
pub use session::{spawn_update_listener, TelegramSession, TelegramSessionFactory};

#[cfg(test)]
mod tests {
    use lw_core::types::UserId;
    use lw_egress::{Egress, EgressError};

    use super::*;

    #[tokio::test]
    async fn egress_without_a_token_fails_fast() {
        let egress = TelegramEgress::new(None);
        let err = egress.send(UserId(1), "hello", None).await.unwrap_err();
        assert!(matches!(err, EgressError::NotConfigured));
    }

    #[tokio::test]
    async fn send_document_without_a_token_fails_fast() {
        let egress = TelegramEgress::new(None);
        let err = egress
            .send_document(UserId(1), "report.txt", vec![1, 2, 3], Some("caption"))
            .await
            .unwrap_err();
        assert!(matches!(err, EgressError::NotConfigured));
    }
}
