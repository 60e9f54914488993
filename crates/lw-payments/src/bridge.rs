use std::sync::Arc;

use tracing::{info, warn};

use lw_core::types::UserId;
use lw_egress::Egress;
use lw_store::Store;

use crate::error::{PaymentsError, Result};
use crate::signature::verify_webhook_signature;
use crate::types::{parse_order_id, OrderId};

/// Tariffs bought through the payment bridge run for this many days (spec
/// §4.6: "assign the tariff for 30 days").
const TARIFF_GRANT_DAYS: i64 = 30;

/// Accepts settled payment events from both channels and commits them
/// idempotently.
pub struct PaymentBridge {
    store: Arc<Store>,
    egress: Arc<dyn Egress>,
    shop_id: String,
    secret_word_2: String,
}

impl PaymentBridge {
    pub fn new(store: Arc<Store>, egress: Arc<dyn Egress>, shop_id: String, secret_word_2: String) -> Arc<Self> {
        Arc::new(Self {
            store,
            egress,
            shop_id,
            secret_word_2,
        })
    }

    /// Channel A: external HMAC-signed webhook. Returns
    /// `BadSignature` on mismatch (caller maps that to HTTP 400) and
    /// `BadOrderId` on an unparseable order id.
    pub async fn handle_webhook(&self, amount: &str, order_id_raw: &str, sign: &str) -> Result<()> {
        if !verify_webhook_signature(&self.shop_id, amount, &self.secret_word_2, order_id_raw, sign) {
            warn!(order_id = %order_id_raw, "payment webhook signature mismatch");
            return Err(PaymentsError::BadSignature);
        }

        let order = parse_order_id(order_id_raw).ok_or_else(|| PaymentsError::BadOrderId(order_id_raw.to_string()))?;
        let amount_minor = parse_amount_minor(amount);
        self.settle(order, amount_minor).await
    }

    /// Channel B: in-band settlement via the bot channel's successful-payment
    /// event. `invoice_payload` is parsed identically to Channel
    /// A's `MERCHANT_ORDER_ID`; the provider has already confirmed the charge,
    /// so no signature check applies here.
    pub async fn handle_in_band_settlement(&self, invoice_payload: &str, amount_minor: i64) -> Result<()> {
        let order =
            parse_order_id(invoice_payload).ok_or_else(|| PaymentsError::BadOrderId(invoice_payload.to_string()))?;
        self.settle(order, amount_minor).await
    }

    /// Always confirm pre-checkout.
    pub fn confirm_pre_checkout(&self) -> bool {
        true
    }

    async fn settle(&self, order: OrderId, amount_minor: i64) -> Result<()> {
        match order {
            OrderId::Tariff { user_id, tariff_plan_id, .. } => {
                self.store.assign_tariff(user_id, tariff_plan_id, TARIFF_GRANT_DAYS)?;
                info!(user_id = %user_id, tariff_plan_id = %tariff_plan_id, "tariff activated via payment");
                self.notify_settlement(user_id, &format!("Your tariff is now active for {TARIFF_GRANT_DAYS} days. Thank you!"))
                    .await;
            }
            OrderId::Legacy { user_id, .. } => {
                self.store.credit_balance(user_id, amount_minor)?;
                info!(user_id = %user_id, amount_minor, "balance credited via payment");
                self.notify_settlement(user_id, &format!("Your balance was topped up by {amount_minor}. Thank you!"))
                    .await;
            }
        }
        Ok(())
    }

    async fn notify_settlement(&self, user_id: UserId, user_message: &str) {
        if let Err(e) = self.egress.send(user_id, user_message, None).await {
            warn!(user_id = %user_id, error = %e, "failed to notify user of settlement");
        }

        let admins = match self.store.list_admin_user_ids() {
            Ok(admins) => admins,
            Err(e) => {
                warn!(error = %e, "failed to list admins for settlement notification");
                return;
            }
        };
        let admin_message = format!("Settled payment for user {user_id}: {user_message}");
        for admin_id in admins {
            if admin_id == user_id {
                continue;
            }
            if let Err(e) = self.egress.send(admin_id, &admin_message, None).await {
                warn!(admin_id = %admin_id, error = %e, "failed to notify admin of settlement");
            }
        }
    }
}

/// Parse a decimal-string amount (`"100.00"`) into minor currency units.
/// Malformed input settles to `0` rather than failing the whole settlement —
/// the signature has already been verified against the same raw string, so a
/// parse failure here indicates an unexpected but signed amount format.
fn parse_amount_minor(amount: &str) -> i64 {
    amount
        .parse::<f64>()
        .map(|major| (major * 100.0).round() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use lw_egress::Markup;

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

    fn setup() -> (Arc<Store>, Arc<RecordingEgress>, Arc<PaymentBridge>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let egress = Arc::new(RecordingEgress::new());
        let bridge = PaymentBridge::new(store.clone(), egress.clone(), "shop1".to_string(), "secret2".to_string());
        (store, egress, bridge)
    }

    #[tokio::test]
    async fn legacy_webhook_credits_balance() {
        let (store, egress, bridge) = setup();
        store.get_or_create_user(UserId(1), None, None, None).unwrap();

        let order_id = "1_1700000000";
        let amount = "150.00";
        let sign = crate::signature::webhook_signature("shop1", amount, "secret2", order_id);

        bridge.handle_webhook(amount, order_id, &sign).await.unwrap();

        assert_eq!(store.get_user(UserId(1)).unwrap().unwrap().balance, 15000);
        assert_eq!(egress.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tariff_webhook_assigns_tariff() {
        let (store, _egress, bridge) = setup();
        store.get_or_create_user(UserId(2), None, None, None).unwrap();
        let plan = store.create_tariff_plan("pro", 1000, 5, 5, None).unwrap();

        let order_id = format!("tariff_2_{}_1700000000", plan.id.0);
        let amount = "10.00";
        let sign = crate::signature::webhook_signature("shop1", amount, "secret2", &order_id);

        bridge.handle_webhook(amount, &order_id, &sign).await.unwrap();

        let tariff = store.get_user_tariff(UserId(2)).unwrap().unwrap();
        assert_eq!(tariff.tariff_plan_id, plan.id);
        assert!(tariff.is_active);
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let (store, _egress, bridge) = setup();
        store.get_or_create_user(UserId(3), None, None, None).unwrap();

        let err = bridge.handle_webhook("10.00", "3_1700000000", "wrongsign").await.unwrap_err();
        assert!(matches!(err, PaymentsError::BadSignature));
    }

    #[tokio::test]
    async fn in_band_settlement_parses_like_channel_a() {
        let (store, _egress, bridge) = setup();
        store.get_or_create_user(UserId(4), None, None, None).unwrap();

        bridge.handle_in_band_settlement("4_1700000000", 2500).await.unwrap();
        assert_eq!(store.get_user(UserId(4)).unwrap().unwrap().balance, 2500);
    }

    #[test]
    fn pre_checkout_always_confirms() {
        let (_store, _egress, bridge) = setup();
        assert!(bridge.confirm_pre_checkout());
    }
}
