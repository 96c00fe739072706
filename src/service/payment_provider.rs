// service/payment_provider.rs
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::Config,
    models::paymentmodel::{GatewayKind, PaymentMethod, PaymentStatus},
    utils::currency::CURRENCY,
};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{gateway} request failed: {source}")]
    Http {
        gateway: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{gateway} rejected the request: {message}")]
    Rejected {
        gateway: &'static str,
        message: String,
    },

    #[error("unexpected {gateway} response: {message}")]
    InvalidResponse {
        gateway: &'static str,
        message: String,
    },
}

const STRIPE: &str = "stripe";
const ABACATEPAY: &str = "abacatepay";

/// Gateway-side view of a freshly created charge.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    pub billing_id: String,
    pub status: PaymentStatus,
    pub client_secret: Option<String>,
    pub pix_br_code: Option<String>,
    pub pix_br_code_base64: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn stripe_status(status: &str) -> PaymentStatus {
    match status {
        "succeeded" => PaymentStatus::Paid,
        "canceled" => PaymentStatus::Cancelled,
        _ => PaymentStatus::Pending,
    }
}

pub fn abacatepay_status(status: &str) -> PaymentStatus {
    match status.to_ascii_uppercase().as_str() {
        "PAID" => PaymentStatus::Paid,
        "EXPIRED" => PaymentStatus::Expired,
        "CANCELLED" | "CANCELED" | "REFUNDED" => PaymentStatus::Cancelled,
        _ => PaymentStatus::Pending,
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value[key].as_str().map(|s| s.to_string())
}

/// Stripe reports failures as `{ "error": { "message": .. } }`.
pub fn parse_stripe_intent(body: &Value) -> Result<Checkout, GatewayError> {
    if let Some(message) = body["error"]["message"].as_str() {
        return Err(GatewayError::Rejected {
            gateway: STRIPE,
            message: message.to_string(),
        });
    }

    let billing_id = string_field(body, "id").ok_or_else(|| GatewayError::InvalidResponse {
        gateway: STRIPE,
        message: "payment intent without id".to_string(),
    })?;
    let status = body["status"].as_str().map(stripe_status).ok_or_else(|| {
        GatewayError::InvalidResponse {
            gateway: STRIPE,
            message: format!("payment intent {} without status", billing_id),
        }
    })?;

    Ok(Checkout {
        billing_id,
        status,
        client_secret: string_field(body, "client_secret"),
        pix_br_code: None,
        pix_br_code_base64: None,
        expires_at: None,
    })
}

/// AbacatePay wraps every answer as `{ "data": .., "error": .. }`.
pub fn parse_abacatepay_pix(body: &Value) -> Result<Checkout, GatewayError> {
    if let Some(message) = body["error"].as_str() {
        return Err(GatewayError::Rejected {
            gateway: ABACATEPAY,
            message: message.to_string(),
        });
    }

    let data = &body["data"];
    let billing_id = string_field(data, "id").ok_or_else(|| GatewayError::InvalidResponse {
        gateway: ABACATEPAY,
        message: "PIX charge without id".to_string(),
    })?;

    Ok(Checkout {
        billing_id,
        status: data["status"]
            .as_str()
            .map(abacatepay_status)
            .unwrap_or(PaymentStatus::Pending),
        client_secret: None,
        pix_br_code: string_field(data, "brCode"),
        pix_br_code_base64: string_field(data, "brCodeBase64"),
        expires_at: parse_timestamp(&data["expiresAt"]),
    })
}

fn parse_abacatepay_check(body: &Value) -> Result<PaymentStatus, GatewayError> {
    if let Some(message) = body["error"].as_str() {
        return Err(GatewayError::Rejected {
            gateway: ABACATEPAY,
            message: message.to_string(),
        });
    }

    body["data"]["status"]
        .as_str()
        .map(abacatepay_status)
        .ok_or_else(|| GatewayError::InvalidResponse {
            gateway: ABACATEPAY,
            message: "PIX check without status".to_string(),
        })
}

/// Card charges go to Stripe PaymentIntents, PIX charges to AbacatePay.
#[derive(Debug, Clone)]
pub struct PaymentProviderService {
    client: reqwest::Client,
    stripe_secret_key: String,
    stripe_base_url: String,
    abacatepay_api_key: String,
    abacatepay_base_url: String,
    pix_expires_in_secs: u64,
}

impl PaymentProviderService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            stripe_secret_key: config.stripe_secret_key.clone(),
            stripe_base_url: config.stripe_base_url.trim_end_matches('/').to_string(),
            abacatepay_api_key: config.abacatepay_api_key.clone(),
            abacatepay_base_url: config.abacatepay_base_url.trim_end_matches('/').to_string(),
            pix_expires_in_secs: config.pix_expires_in_secs,
        }
    }

    pub async fn create_checkout(
        &self,
        method: PaymentMethod,
        amount_cents: i64,
        service_id: Uuid,
        description: &str,
    ) -> Result<Checkout, GatewayError> {
        match method {
            PaymentMethod::Card => self.stripe_create_intent(amount_cents, service_id, description).await,
            PaymentMethod::Pix => self.abacatepay_create_pix(amount_cents, service_id, description).await,
        }
    }

    pub async fn fetch_status(
        &self,
        gateway: GatewayKind,
        billing_id: &str,
    ) -> Result<PaymentStatus, GatewayError> {
        match gateway {
            GatewayKind::Stripe => self.stripe_fetch_intent(billing_id).await,
            GatewayKind::Abacatepay => self.abacatepay_check_pix(billing_id).await,
        }
    }

    /// AbacatePay has no cancel endpoint for PIX QR codes; the charge simply
    /// expires, so only Stripe is called.
    pub async fn cancel(&self, gateway: GatewayKind, billing_id: &str) -> Result<(), GatewayError> {
        match gateway {
            GatewayKind::Stripe => self.stripe_cancel_intent(billing_id).await,
            GatewayKind::Abacatepay => Ok(()),
        }
    }

    fn stripe_key(&self) -> Result<&str, GatewayError> {
        if self.stripe_secret_key.is_empty() {
            return Err(GatewayError::NotConfigured("STRIPE_SECRET_KEY"));
        }
        Ok(&self.stripe_secret_key)
    }

    fn abacatepay_key(&self) -> Result<&str, GatewayError> {
        if self.abacatepay_api_key.is_empty() {
            return Err(GatewayError::NotConfigured("ABACATEPAY_API_KEY"));
        }
        Ok(&self.abacatepay_api_key)
    }

    // Stripe: create PaymentIntent
    async fn stripe_create_intent(
        &self,
        amount_cents: i64,
        service_id: Uuid,
        description: &str,
    ) -> Result<Checkout, GatewayError> {
        let key = self.stripe_key()?;
        let form = [
            ("amount", amount_cents.to_string()),
            ("currency", CURRENCY.to_ascii_lowercase()),
            ("payment_method_types[]", "card".to_string()),
            ("description", description.to_string()),
            ("metadata[service_id]", service_id.to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/payment_intents", self.stripe_base_url))
            .bearer_auth(key)
            .form(&form)
            .send()
            .await
            .map_err(|source| GatewayError::Http { gateway: STRIPE, source })?;

        let body: Value = response
            .json()
            .await
            .map_err(|source| GatewayError::Http { gateway: STRIPE, source })?;

        parse_stripe_intent(&body)
    }

    // Stripe: retrieve PaymentIntent
    async fn stripe_fetch_intent(&self, intent_id: &str) -> Result<PaymentStatus, GatewayError> {
        let key = self.stripe_key()?;

        let response = self
            .client
            .get(format!("{}/payment_intents/{}", self.stripe_base_url, intent_id))
            .bearer_auth(key)
            .send()
            .await
            .map_err(|source| GatewayError::Http { gateway: STRIPE, source })?;

        let body: Value = response
            .json()
            .await
            .map_err(|source| GatewayError::Http { gateway: STRIPE, source })?;

        parse_stripe_intent(&body).map(|intent| intent.status)
    }

    // Stripe: cancel PaymentIntent
    async fn stripe_cancel_intent(&self, intent_id: &str) -> Result<(), GatewayError> {
        let key = self.stripe_key()?;

        let response = self
            .client
            .post(format!("{}/payment_intents/{}/cancel", self.stripe_base_url, intent_id))
            .bearer_auth(key)
            .send()
            .await
            .map_err(|source| GatewayError::Http { gateway: STRIPE, source })?;

        let body: Value = response
            .json()
            .await
            .map_err(|source| GatewayError::Http { gateway: STRIPE, source })?;

        let intent = parse_stripe_intent(&body)?;
        if intent.status != PaymentStatus::Cancelled {
            return Err(GatewayError::InvalidResponse {
                gateway: STRIPE,
                message: format!("intent {} is {} after cancel", intent_id, intent.status.to_str()),
            });
        }

        Ok(())
    }

    // AbacatePay: create PIX QR code
    async fn abacatepay_create_pix(
        &self,
        amount_cents: i64,
        service_id: Uuid,
        description: &str,
    ) -> Result<Checkout, GatewayError> {
        let key = self.abacatepay_key()?;
        // AbacatePay limits the description to 37 characters
        let description: String = description.chars().take(37).collect();
        let payload = serde_json::json!({
            "amount": amount_cents,
            "expiresIn": self.pix_expires_in_secs,
            "description": description,
            "metadata": { "externalId": service_id.to_string() },
        });

        let response = self
            .client
            .post(format!("{}/pixQrCode/create", self.abacatepay_base_url))
            .bearer_auth(key)
            .json(&payload)
            .send()
            .await
            .map_err(|source| GatewayError::Http { gateway: ABACATEPAY, source })?;

        let body: Value = response
            .json()
            .await
            .map_err(|source| GatewayError::Http { gateway: ABACATEPAY, source })?;

        parse_abacatepay_pix(&body)
    }

    // AbacatePay: check PIX QR code
    async fn abacatepay_check_pix(&self, pix_id: &str) -> Result<PaymentStatus, GatewayError> {
        let key = self.abacatepay_key()?;

        let response = self
            .client
            .get(format!("{}/pixQrCode/check", self.abacatepay_base_url))
            .query(&[("id", pix_id)])
            .bearer_auth(key)
            .send()
            .await
            .map_err(|source| GatewayError::Http { gateway: ABACATEPAY, source })?;

        let body: Value = response
            .json()
            .await
            .map_err(|source| GatewayError::Http { gateway: ABACATEPAY, source })?;

        parse_abacatepay_check(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stripe_intent_fields() {
        let body = json!({
            "id": "pi_123",
            "object": "payment_intent",
            "status": "requires_payment_method",
            "client_secret": "pi_123_secret_abc",
        });

        let checkout = parse_stripe_intent(&body).unwrap();
        assert_eq!(checkout.billing_id, "pi_123");
        assert_eq!(checkout.status, PaymentStatus::Pending);
        assert_eq!(checkout.client_secret.as_deref(), Some("pi_123_secret_abc"));
        assert!(checkout.pix_br_code.is_none());
    }

    #[test]
    fn stripe_error_body_is_rejected() {
        let body = json!({ "error": { "message": "Invalid API Key provided", "type": "invalid_request_error" } });

        let err = parse_stripe_intent(&body).unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
        assert!(err.to_string().contains("Invalid API Key provided"));
    }

    #[test]
    fn abacatepay_pix_fields() {
        let body = json!({
            "data": {
                "id": "pix_char_123",
                "amount": 10000,
                "status": "PENDING",
                "brCode": "00020101021226950014br.gov.bcb.pix",
                "brCodeBase64": "data:image/png;base64,iVBORw0KGgo",
                "expiresAt": "2025-03-25T21:50:20.772Z"
            },
            "error": null
        });

        let checkout = parse_abacatepay_pix(&body).unwrap();
        assert_eq!(checkout.billing_id, "pix_char_123");
        assert_eq!(checkout.status, PaymentStatus::Pending);
        assert!(checkout.pix_br_code.unwrap().starts_with("000201"));
        assert!(checkout.pix_br_code_base64.is_some());
        assert!(checkout.expires_at.is_some());
    }

    #[test]
    fn abacatepay_error_and_missing_id() {
        let err = parse_abacatepay_pix(&json!({ "data": null, "error": "Unauthorized" })).unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));

        let err = parse_abacatepay_pix(&json!({ "data": {}, "error": null })).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse { .. }));
    }

    #[test]
    fn gateway_statuses() {
        assert_eq!(stripe_status("succeeded"), PaymentStatus::Paid);
        assert_eq!(stripe_status("canceled"), PaymentStatus::Cancelled);
        assert_eq!(stripe_status("processing"), PaymentStatus::Pending);

        assert_eq!(abacatepay_status("PAID"), PaymentStatus::Paid);
        assert_eq!(abacatepay_status("expired"), PaymentStatus::Expired);
        assert_eq!(abacatepay_status("CANCELLED"), PaymentStatus::Cancelled);
        assert_eq!(abacatepay_status("PENDING"), PaymentStatus::Pending);

        let status = parse_abacatepay_check(&json!({ "data": { "status": "PAID" }, "error": null })).unwrap();
        assert_eq!(status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let mut config = crate::config::test_config();
        config.stripe_secret_key.clear();
        let provider = PaymentProviderService::new(&config);

        let err = provider
            .create_checkout(PaymentMethod::Card, 10_000, Uuid::new_v4(), "Paint")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured("STRIPE_SECRET_KEY")));
    }

    #[tokio::test]
    async fn pix_cancel_is_local() {
        let provider = PaymentProviderService::new(&crate::config::test_config());
        assert!(provider.cancel(GatewayKind::Abacatepay, "pix_char_123").await.is_ok());
    }
}
