//! Entitlement enforcement and lifecycle reminders.

pub mod checker;
pub mod error;
pub mod types;

pub use checker::TariffChecker;
pub use error::{Result, TariffError};
pub use types::NotificationKind;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use lw_core::types::UserId;
    use lw_egress::{Egress, Markup};
    use lw_store::Store;

    use super::*;

    struct RecordingEgress {
        sent: Mutex<Vec<(UserId, String)>>,
    }

    impl RecordingEgress {
        fn new() -> Self {
            Self { sent: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Egress for RecordingEgress {
        async fn send(&self, user_id: UserId, body: &str, _markup: Option<Markup>) -> lw_egress::Result<()> {
            self.sent.lock().unwrap().push((user_id, body.to_string()));
            Ok(())
        }

        async fn send_document(
            &self,
            _user_id: UserId,
            _filename: &str,
            _bytes: Vec<u8>,
            _caption: Option<&str>,
        ) -> lw_egress::Result<()> {
            Ok(())
        }
    }

    fn setup() -> (Arc<Store>, Arc<RecordingEgress>, Arc<TariffChecker>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let egress = Arc::new(RecordingEgress::new());
        let checker = TariffChecker::new(store.clone(), egress.clone());
        (store, egress, checker)
    }

    #[tokio::test]
    async fn expired_tariff_is_deactivated_and_notified_once() {
        let (store, egress, checker) = setup();
        let user = store.get_or_create_user(UserId(1), None, None, None).unwrap();
        let plan = store
            .create_tariff_plan("pro", 1000, 5, 5, None)
            .unwrap();
        store.assign_tariff(user.id, plan.id, -1).unwrap();

        checker.tick().await;
        assert!(!store.is_tariff_active(user.id).unwrap());
        assert_eq!(egress.sent.lock().unwrap().len(), 1);

        checker.tick().await;
        assert_eq!(egress.sent.lock().unwrap().len(), 1, "expired notice must not repeat within the window");
    }

    #[tokio::test]
    async fn active_tariff_far_from_expiry_sends_nothing() {
        let (store, egress, checker) = setup();
        let user = store.get_or_create_user(UserId(2), None, None, None).unwrap();
        let plan = store.create_tariff_plan("pro", 1000, 5, 5, None).unwrap();
        store.assign_tariff(user.id, plan.id, 10).unwrap();

        checker.tick().await;
        assert!(store.is_tariff_active(user.id).unwrap());
        assert!(egress.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_helpers_delegate_to_store() {
        let (store, _egress, checker) = setup();
        let user = store.get_or_create_user(UserId(3), None, None, None).unwrap();
        assert!(checker.is_tariff_active(user.id));
        assert!(checker.can_create_project(user.id));
    }

    #[tokio::test]
    async fn remaining_free_extractions_counts_down_from_the_limit() {
        let (store, _egress, checker) = setup();
        let user = store.get_or_create_user(UserId(4), None, None, None).unwrap();
        assert_eq!(checker.remaining_free_extractions(user.id, 3), 3);

        store.increment_free_extractions_used(user.id).unwrap();
        store.increment_free_extractions_used(user.id).unwrap();
        assert_eq!(checker.remaining_free_extractions(user.id, 3), 1);

        store.increment_free_extractions_used(user.id).unwrap();
        store.increment_free_extractions_used(user.id).unwrap();
        assert_eq!(
            checker.remaining_free_extractions(user.id, 3),
            0,
            "usage past the limit never goes negative"
        );
    }
}
