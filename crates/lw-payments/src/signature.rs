use md5::{Digest, Md5};

/// Webhook verification digest:
/// `md5(merchant_id ":" amount ":" secret_word_2 ":" order_id)`, compared
/// case-insensitively against the provider-supplied `SIGN`.
pub fn webhook_signature(merchant_id: &str, amount: &str, secret_word_2: &str, order_id: &str) -> String {
    digest_hex(&format!("{merchant_id}:{amount}:{secret_word_2}:{order_id}"))
}

pub fn verify_webhook_signature(
    merchant_id: &str,
    amount: &str,
    secret_word_2: &str,
    order_id: &str,
    provided_sign: &str,
) -> bool {
    let expected = webhook_signature(merchant_id, amount, secret_word_2, order_id);
    expected.eq_ignore_ascii_case(provided_sign)
}

/// Outbound payment-form URL signature:
/// `md5(shop_id:amount:secret_word_1:RUB:order_id)`.
pub fn outbound_signature(shop_id: &str, amount: &str, secret_word_1: &str, order_id: &str) -> String {
    digest_hex(&format!("{shop_id}:{amount}:{secret_word_1}:RUB:{order_id}"))
}

/// Build the FreeKassa-style outbound payment-form URL.
pub fn build_payment_url(shop_id: &str, amount: &str, secret_word_1: &str, order_id: &str) -> String {
    let sign = outbound_signature(shop_id, amount, secret_word_1, order_id);
    format!("https://pay.fk.money/?m={shop_id}&oa={amount}&currency=RUB&o={order_id}&s={sign}")
}

fn digest_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_case_insensitively() {
        let sign = webhook_signature("shop1", "100.00", "secret", "42_1700000000");
        assert!(verify_webhook_signature(
            "shop1",
            "100.00",
            "secret",
            "42_1700000000",
            &sign.to_uppercase()
        ));
    }

    #[test]
    fn signature_rejects_tampered_amount() {
        let sign = webhook_signature("shop1", "100.00", "secret", "42_1700000000");
        assert!(!verify_webhook_signature(
            "shop1",
            "999.00",
            "secret",
            "42_1700000000",
            &sign
        ));
    }

    #[test]
    fn outbound_url_has_expected_shape() {
        let url = build_payment_url("shop1", "100.00", "secret1", "42_1700000000");
        assert!(url.starts_with("https://pay.fk.money/?m=shop1&oa=100.00&currency=RUB&o=42_1700000000&s="));
    }
}
