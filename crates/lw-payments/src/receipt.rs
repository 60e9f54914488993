use serde_json::{json, Value};

/// In-band payment receipt JSON for tax-receipt enrichment.
///
/// Defaults per the original provider integration (undocumented in the
/// distilled spec, carried over as-is): `vat_code = 1` (no VAT), full
/// prepayment, commodity subject.
pub fn build_receipt(title: &str, amount_major: f64) -> Value {
    json!({
        "receipt": {
            "items": [{
                "description": title,
                "quantity": 1,
                "amount": {
                    "value": format!("{:.2}", amount_major),
                    "currency": "RUB",
                },
                "vat_code": 1,
                "payment_mode": "full_payment",
                "payment_subject": "commodity",
            }]
        }
    })
}
