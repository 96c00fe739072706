//! Inbound gateway webhooks: signature checks and payload decoding.
//!
//! AbacatePay signs the raw body with HMAC-SHA256 and sends the digest as hex
//! or base64. Stripe sends `t=<unix>,v1=<hex>` and signs `"{t}.{body}"`.
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::{error::HttpError, models::paymentmodel::PaymentStatus};

type HmacSha256 = Hmac<Sha256>;

pub const ABACATEPAY_SIGNATURE_HEADERS: [&str; 2] = ["x-abacatepay-signature", "x-abacate-signature"];
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";
pub const STRIPE_TOLERANCE_SECS: i64 = 300;

#[derive(Error, Debug, PartialEq)]
pub enum WebhookError {
    #[error("Missing webhook signature")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Webhook timestamp outside the tolerance window")]
    StaleTimestamp,

    #[error("Malformed webhook payload: {0}")]
    Malformed(String),

    #[error("Webhook secret is not configured")]
    NotConfigured,
}

impl From<WebhookError> for HttpError {
    fn from(error: WebhookError) -> Self {
        let status = match error {
            WebhookError::MissingSignature | WebhookError::Malformed(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature | WebhookError::StaleTimestamp => StatusCode::UNAUTHORIZED,
            WebhookError::NotConfigured => {
                tracing::error!("webhook received but no secret is configured");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        HttpError::new(error.to_string(), status)
    }
}

/// A decoded gateway notification.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub event_id: String,
    pub event_type: String,
    pub billing_id: Option<String>,
    /// `None` for events that do not move a payment.
    pub target_status: Option<PaymentStatus>,
}

fn hmac_sha256(secret: &str, parts: &[&[u8]]) -> Result<Vec<u8>, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::NotConfigured)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

fn decode_signature(signature: &str) -> Option<Vec<u8>> {
    let signature = signature.trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

    hex::decode(signature)
        .ok()
        .filter(|bytes| bytes.len() == 32)
        .or_else(|| STANDARD.decode(signature).ok())
}

pub fn verify_abacatepay_signature(
    raw_body: &[u8],
    signature: Option<&str>,
    secret: &str,
) -> Result<(), WebhookError> {
    if secret.is_empty() {
        return Err(WebhookError::NotConfigured);
    }
    let signature = signature
        .filter(|s| !s.trim().is_empty())
        .ok_or(WebhookError::MissingSignature)?;

    let expected = hmac_sha256(secret, &[raw_body])?;
    let provided = decode_signature(signature).ok_or(WebhookError::InvalidSignature)?;

    if bool::from(expected.ct_eq(&provided)) {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

pub fn verify_stripe_signature(
    raw_body: &[u8],
    header: Option<&str>,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    if secret.is_empty() {
        return Err(WebhookError::NotConfigured);
    }
    let header = header
        .filter(|s| !s.trim().is_empty())
        .ok_or(WebhookError::MissingSignature)?;

    let mut timestamp = None;
    let mut candidates = Vec::new();
    for item in header.split(',') {
        match item.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    if candidates.is_empty() {
        return Err(WebhookError::InvalidSignature);
    }

    let expected = hmac_sha256(secret, &[timestamp.to_string().as_bytes(), b".", raw_body])?;
    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|provided| bool::from(expected.ct_eq(&provided)))
            .unwrap_or(false)
    });

    if !matched {
        return Err(WebhookError::InvalidSignature);
    }

    if (now - timestamp).abs() > STRIPE_TOLERANCE_SECS {
        return Err(WebhookError::StaleTimestamp);
    }

    Ok(())
}

/// Payload `id`, or the SHA-256 of the raw body for gateways that omit it.
fn event_id(payload: &Value, raw_body: &[u8]) -> String {
    payload["id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .map(|id| id.to_string())
        .unwrap_or_else(|| hex::encode(Sha256::digest(raw_body)))
}

fn parse_json(raw_body: &[u8]) -> Result<Value, WebhookError> {
    serde_json::from_slice(raw_body).map_err(|e| WebhookError::Malformed(e.to_string()))
}

pub fn parse_abacatepay_event(raw_body: &[u8]) -> Result<GatewayEvent, WebhookError> {
    let payload = parse_json(raw_body)?;

    let event_type = payload["event"]
        .as_str()
        .ok_or_else(|| WebhookError::Malformed("missing event".to_string()))?
        .to_string();

    let data = &payload["data"];
    let billing_id = [&data["pixQrCode"]["id"], &data["billing"]["id"], &data["id"]]
        .into_iter()
        .find_map(|v| v.as_str())
        .map(|s| s.to_string());

    let target_status = match event_type.as_str() {
        "billing.paid" => Some(PaymentStatus::Paid),
        "billing.cancelled" => Some(PaymentStatus::Cancelled),
        "billing.expired" => Some(PaymentStatus::Expired),
        _ => None,
    };

    Ok(GatewayEvent {
        event_id: event_id(&payload, raw_body),
        event_type,
        billing_id,
        target_status,
    })
}

pub fn parse_stripe_event(raw_body: &[u8]) -> Result<GatewayEvent, WebhookError> {
    let payload = parse_json(raw_body)?;

    let event_type = payload["type"]
        .as_str()
        .ok_or_else(|| WebhookError::Malformed("missing type".to_string()))?
        .to_string();

    let object = &payload["data"]["object"];
    let billing_id = match object["object"].as_str() {
        Some("payment_intent") | None => object["id"].as_str().map(|s| s.to_string()),
        // charge events point back at their intent
        Some(_) => object["payment_intent"].as_str().map(|s| s.to_string()),
    };

    let target_status = match event_type.as_str() {
        "payment_intent.succeeded" => Some(PaymentStatus::Paid),
        "payment_intent.canceled" => Some(PaymentStatus::Cancelled),
        _ => None,
    };

    Ok(GatewayEvent {
        event_id: event_id(&payload, raw_body),
        event_type,
        billing_id,
        target_status,
    })
}

#[cfg(test)]
pub fn sign_abacatepay(raw_body: &[u8], secret: &str) -> String {
    hex::encode(hmac_sha256(secret, &[raw_body]).unwrap())
}

#[cfg(test)]
pub fn sign_stripe(raw_body: &[u8], secret: &str, timestamp: i64) -> String {
    let digest = hmac_sha256(secret, &[timestamp.to_string().as_bytes(), b".", raw_body]).unwrap();
    format!("t={},v1={}", timestamp, hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "abacate-secret";

    fn paid_body() -> Vec<u8> {
        serde_json::json!({
            "id": "log_abc123",
            "event": "billing.paid",
            "devMode": false,
            "data": {
                "pixQrCode": { "id": "pix_char_123", "amount": 10000, "status": "PAID" },
                "payment": { "amount": 10000, "fee": 80, "method": "PIX" }
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn abacatepay_hex_and_base64_signatures() {
        let body = paid_body();
        let hex_sig = sign_abacatepay(&body, SECRET);
        assert_eq!(verify_abacatepay_signature(&body, Some(hex_sig.as_str()), SECRET), Ok(()));

        let raw = hex::decode(&hex_sig).unwrap();
        let b64_sig = STANDARD.encode(raw);
        assert_eq!(verify_abacatepay_signature(&body, Some(b64_sig.as_str()), SECRET), Ok(()));

        let prefixed = format!("sha256={}", hex_sig);
        assert_eq!(verify_abacatepay_signature(&body, Some(prefixed.as_str()), SECRET), Ok(()));
    }

    #[test]
    fn abacatepay_rejects_tampering() {
        let body = paid_body();
        let sig = sign_abacatepay(&body, SECRET);

        let mut tampered = body.clone();
        tampered.extend_from_slice(b" ");
        assert_eq!(
            verify_abacatepay_signature(&tampered, Some(sig.as_str()), SECRET),
            Err(WebhookError::InvalidSignature)
        );
        assert_eq!(
            verify_abacatepay_signature(&body, Some(sig.as_str()), "other-secret"),
            Err(WebhookError::InvalidSignature)
        );
        assert_eq!(
            verify_abacatepay_signature(&body, Some("not a signature"), SECRET),
            Err(WebhookError::InvalidSignature)
        );
        assert_eq!(
            verify_abacatepay_signature(&body, None, SECRET),
            Err(WebhookError::MissingSignature)
        );
        assert_eq!(
            verify_abacatepay_signature(&body, Some(sig.as_str()), ""),
            Err(WebhookError::NotConfigured)
        );
    }

    #[test]
    fn stripe_signature_and_tolerance() {
        let body = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
        let t = 1_700_000_000;
        let header = sign_stripe(body, "whsec_test", t);

        assert_eq!(verify_stripe_signature(body, Some(header.as_str()), "whsec_test", t + 10), Ok(()));
        assert_eq!(
            verify_stripe_signature(body, Some(header.as_str()), "whsec_test", t + STRIPE_TOLERANCE_SECS + 1),
            Err(WebhookError::StaleTimestamp)
        );
        assert_eq!(
            verify_stripe_signature(b"{}", Some(header.as_str()), "whsec_test", t),
            Err(WebhookError::InvalidSignature)
        );
        assert_eq!(
            verify_stripe_signature(body, Some("v1=abcd"), "whsec_test", t),
            Err(WebhookError::InvalidSignature)
        );
        assert_eq!(
            verify_stripe_signature(body, None, "whsec_test", t),
            Err(WebhookError::MissingSignature)
        );
    }

    #[test]
    fn stripe_accepts_any_matching_v1() {
        let body = br#"{"id":"evt_2"}"#;
        let t = 1_700_000_000;
        let good = sign_stripe(body, "whsec_test", t);
        let v1 = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", t, "00".repeat(32), v1);

        assert_eq!(verify_stripe_signature(body, Some(header.as_str()), "whsec_test", t), Ok(()));
    }

    #[test]
    fn abacatepay_billing_id_sources() {
        let event = parse_abacatepay_event(&paid_body()).unwrap();
        assert_eq!(event.event_id, "log_abc123");
        assert_eq!(event.event_type, "billing.paid");
        assert_eq!(event.billing_id.as_deref(), Some("pix_char_123"));
        assert_eq!(event.target_status, Some(PaymentStatus::Paid));

        let billing = br#"{"event":"billing.expired","data":{"billing":{"id":"bill_9"}}}"#;
        let event = parse_abacatepay_event(billing).unwrap();
        assert_eq!(event.billing_id.as_deref(), Some("bill_9"));
        assert_eq!(event.target_status, Some(PaymentStatus::Expired));

        let flat = br#"{"event":"billing.cancelled","data":{"id":"bill_10"}}"#;
        let event = parse_abacatepay_event(flat).unwrap();
        assert_eq!(event.billing_id.as_deref(), Some("bill_10"));
    }

    #[test]
    fn missing_event_id_falls_back_to_body_digest() {
        let body = br#"{"event":"billing.paid","data":{"id":"bill_1"}}"#;
        let first = parse_abacatepay_event(body).unwrap();
        let second = parse_abacatepay_event(body).unwrap();

        assert_eq!(first.event_id.len(), 64);
        assert_eq!(first.event_id, second.event_id);
    }

    #[test]
    fn unknown_events_carry_no_target() {
        let body = br#"{"event":"withdraw.done","data":{"id":"w_1"}}"#;
        assert_eq!(parse_abacatepay_event(body).unwrap().target_status, None);

        assert!(matches!(
            parse_abacatepay_event(b"not json"),
            Err(WebhookError::Malformed(_))
        ));
    }

    #[test]
    fn stripe_events() {
        let body = br#"{"id":"evt_1","type":"payment_intent.canceled","data":{"object":{"id":"pi_1","object":"payment_intent"}}}"#;
        let event = parse_stripe_event(body).unwrap();
        assert_eq!(event.event_id, "evt_1");
        assert_eq!(event.billing_id.as_deref(), Some("pi_1"));
        assert_eq!(event.target_status, Some(PaymentStatus::Cancelled));

        let charge = br#"{"id":"evt_2","type":"charge.succeeded","data":{"object":{"id":"ch_1","object":"charge","payment_intent":"pi_1"}}}"#;
        let event = parse_stripe_event(charge).unwrap();
        assert_eq!(event.billing_id.as_deref(), Some("pi_1"));
        assert_eq!(event.target_status, None);
    }

    #[test]
    fn signature_errors_map_to_statuses() {
        let missing: HttpError = WebhookError::MissingSignature.into();
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);

        let invalid: HttpError = WebhookError::InvalidSignature.into();
        assert_eq!(invalid.status, StatusCode::UNAUTHORIZED);
    }
}
