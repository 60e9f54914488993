//! Inbound payment webhook ingress — `POST /tracking/payment/notification`
//!.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::{info, warn};

use lw_payments::PaymentsError;

use crate::app::AppState;

/// Accepts `application/x-www-form-urlencoded` or a single-key form whose
/// key is a JSON body, verifies the signature, and settles the
/// payment. Response: `YES` / 200 on success, `{"error":...}` / 400 on
/// signature or field failure, 500 on internal error.
pub async fn payment_webhook_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<String, (StatusCode, Json<Value>)> {
    let fields = parse_payment_fields(&body).ok_or_else(|| {
        warn!("payment webhook: body is neither form-urlencoded nor a JSON object");
        bad_request("malformed request body")
    })?;

    let amount = field(&fields, "AMOUNT")?;
    let order_id = field(&fields, "MERCHANT_ORDER_ID")?;
    let sign = field(&fields, "SIGN")?;

    match state.payment_bridge.handle_webhook(amount, order_id, sign).await {
        Ok(()) => {
            info!(order_id = %order_id, "payment webhook settled");
            Ok("YES".to_string())
        }
        Err(PaymentsError::BadSignature) => {
            warn!(order_id = %order_id, "payment webhook signature mismatch");
            Err(bad_request("signature mismatch"))
        }
        Err(PaymentsError::BadOrderId(raw)) => {
            warn!(order_id = %raw, "payment webhook order id unparseable");
            Err(bad_request("unparseable order id"))
        }
        Err(e) => {
            warn!(order_id = %order_id, error = %e, "payment webhook settlement failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal error"})),
            ))
        }
    }
}

fn field<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str, (StatusCode, Json<Value>)> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| bad_request(&format!("missing field: {name}")))
}

fn bad_request(reason: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({"error": reason})))
}

/// Most providers send a normal urlencoded body (`AMOUNT=...&SIGN=...`).
/// Some send a single urlencoded key whose name is itself a JSON object, or
/// post a JSON body directly — both are accepted the same way.
fn parse_payment_fields(body: &[u8]) -> Option<HashMap<String, String>> {
    if let Ok(pairs) = serde_urlencoded::from_bytes::<HashMap<String, String>>(body) {
        if pairs.contains_key("AMOUNT") || pairs.contains_key("MERCHANT_ORDER_ID") {
            return Some(pairs);
        }
        if pairs.len() == 1 {
            if let Some(key) = pairs.keys().next() {
                if let Ok(value) = serde_json::from_str::<Value>(key) {
                    if let Some(fields) = json_object_to_fields(value) {
                        return Some(fields);
                    }
                }
            }
        }
    }

    serde_json::from_slice::<Value>(body).ok().and_then(json_object_to_fields)
}

fn json_object_to_fields(value: Value) -> Option<HashMap<String, String>> {
    let obj = value.as_object()?;
    Some(obj.iter().map(|(k, v)| (k.clone(), value_to_string(v))).collect())
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_form_body() {
        let body = b"AMOUNT=100.00&MERCHANT_ORDER_ID=1_1700000000&SIGN=abc123&MERCHANT_ID=shop1";
        let fields = parse_payment_fields(body).unwrap();
        assert_eq!(fields.get("AMOUNT").unwrap(), "100.00");
        assert_eq!(fields.get("MERCHANT_ORDER_ID").unwrap(), "1_1700000000");
    }

    #[test]
    fn parses_single_key_json_form_body() {
        let json = r#"{"AMOUNT":"50.00","MERCHANT_ORDER_ID":"2_1700000000","SIGN":"def456"}"#;
        let body = serde_urlencoded::to_string([(json, "")]).unwrap();
        let fields = parse_payment_fields(body.as_bytes()).unwrap();
        assert_eq!(fields.get("AMOUNT").unwrap(), "50.00");
    }

    #[test]
    fn parses_raw_json_body() {
        let body = br#"{"AMOUNT":"75.00","MERCHANT_ORDER_ID":"3_1700000000","SIGN":"ghi789"}"#;
        let fields = parse_payment_fields(body).unwrap();
        assert_eq!(fields.get("SIGN").unwrap(), "ghi789");
    }

    #[test]
    fn rejects_garbage_body() {
        assert!(parse_payment_fields(b"not a form and not json").is_none());
    }
}
