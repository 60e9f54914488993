pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::Store;

#[cfg(test)]
mod tests {
    use lw_core::types::{ChatHandle, UserId};

    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn new_user_gets_zero_tariff_plan() {
        let s = store();
        let user = s
            .get_or_create_user(UserId(1), Some("alice"), None, None)
            .unwrap();
        assert_eq!(user.balance, 0);

        let tariff = s.get_user_tariff(UserId(1)).unwrap().unwrap();
        assert_eq!(tariff.tariff_plan_id, types::ZERO_TARIFF_PLAN_ID);
        assert!(tariff.is_active);
    }

    #[test]
    fn get_or_create_user_is_idempotent() {
        let s = store();
        let first = s
            .get_or_create_user(UserId(7), Some("bob"), None, None)
            .unwrap();
        let second = s
            .get_or_create_user(UserId(7), Some("someone-else"), None, None)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.username.as_deref(), Some("bob"));
    }

    #[test]
    fn assign_tariff_replaces_the_single_row_per_user() {
        let s = store();
        s.get_or_create_user(UserId(1), None, None, None).unwrap();
        let plan = s
            .create_tariff_plan("pro", 500, 10, 50, Some("paid tier"))
            .unwrap();

        s.assign_tariff(UserId(1), plan.id, 30).unwrap();
        let tariff = s.get_user_tariff(UserId(1)).unwrap().unwrap();
        assert_eq!(tariff.tariff_plan_id, plan.id);

        let other_plan = s.create_tariff_plan("pro2", 900, 20, 100, None).unwrap();
        s.assign_tariff(UserId(1), other_plan.id, 60).unwrap();
        let tariff = s.get_user_tariff(UserId(1)).unwrap().unwrap();
        assert_eq!(tariff.tariff_plan_id, other_plan.id);
    }

    #[test]
    fn expired_tariff_is_lazily_deactivated_on_read() {
        let s = store();
        s.get_or_create_user(UserId(1), None, None, None).unwrap();
        let plan = s.create_tariff_plan("pro", 500, 10, 50, None).unwrap();
        // Assign a plan that already expired.
        s.assign_tariff(UserId(1), plan.id, -1).unwrap();

        let tariff = s.get_user_tariff(UserId(1)).unwrap().unwrap();
        assert!(!tariff.is_active);
        assert!(!s.is_tariff_active(UserId(1)).unwrap());
    }

    #[test]
    fn referral_code_cannot_be_deleted_while_referenced() {
        let s = store();
        s.create_referral_link("PROMO").unwrap();
        s.get_or_create_user(UserId(1), None, None, Some("PROMO"))
            .unwrap();

        let err = s.delete_referral_link("PROMO").unwrap_err();
        assert!(matches!(err, StoreError::ReferralCodeInUse(_)));
    }

    #[test]
    fn tariff_plan_cannot_be_deleted_while_assigned() {
        let s = store();
        s.get_or_create_user(UserId(1), None, None, None).unwrap();
        let plan = s.create_tariff_plan("pro", 500, 10, 50, None).unwrap();
        s.assign_tariff(UserId(1), plan.id, 30).unwrap();

        let err = s.delete_tariff_plan(plan.id).unwrap_err();
        assert!(matches!(err, StoreError::TariffPlanInUse(_)));
    }

    #[test]
    fn duplicate_chat_in_same_project_is_rejected() {
        let s = store();
        s.get_or_create_user(UserId(1), None, None, None).unwrap();
        let project = s.create_project(UserId(1), "leads", None).unwrap();
        let handle = ChatHandle::from("@some_chat");

        s.create_chat(project.id, &handle, None, None, None, None)
            .unwrap();
        let err = s
            .create_chat(project.id, &handle, None, None, None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateChat(_)));
    }

    #[test]
    fn can_create_project_respects_plan_cap() {
        let s = store();
        // Zero plan caps at 1 project.
        s.get_or_create_user(UserId(1), None, None, None).unwrap();
        assert!(s.can_create_project(UserId(1)).unwrap());
        s.create_project(UserId(1), "first", None).unwrap();
        assert!(!s.can_create_project(UserId(1)).unwrap());
    }

    #[test]
    fn credit_balance_is_reflected_in_payment_history() {
        let s = store();
        s.get_or_create_user(UserId(1), None, None, None).unwrap();
        s.credit_balance(UserId(1), 1000).unwrap();
        s.credit_balance(UserId(1), 500).unwrap();

        let user = s.get_user(UserId(1)).unwrap().unwrap();
        assert_eq!(user.balance, 1500);

        let payments = s.list_payments(UserId(1), None, 10).unwrap();
        assert_eq!(payments.len(), 2);
    }

    #[test]
    fn try_debit_balance_fails_when_insufficient() {
        let s = store();
        s.get_or_create_user(UserId(1), None, None, None).unwrap();
        s.credit_balance(UserId(1), 100).unwrap();

        let err = s.try_debit_balance(UserId(1), 500).unwrap_err();
        assert!(matches!(err, StoreError::InsufficientBalance { .. }));

        s.try_debit_balance(UserId(1), 50).unwrap();
        assert_eq!(s.get_user(UserId(1)).unwrap().unwrap().balance, 50);
    }

    #[test]
    fn deleting_project_cascades_to_chats() {
        let s = store();
        s.get_or_create_user(UserId(1), None, None, None).unwrap();
        let project = s.create_project(UserId(1), "leads", None).unwrap();
        let chat = s
            .create_chat(
                project.id,
                &ChatHandle::from("@c"),
                None,
                None,
                None,
                None,
            )
            .unwrap();

        s.delete_project(project.id).unwrap();
        assert!(s.get_chat(chat.id).unwrap().is_none());
    }
}
