use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
    Expired,
}

impl PaymentStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// `pending -> paid | cancelled | expired`; terminal states never move.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        *self == PaymentStatus::Pending && next != PaymentStatus::Pending
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Pix,
}

impl PaymentMethod {
    pub fn gateway(&self) -> GatewayKind {
        match self {
            PaymentMethod::Card => GatewayKind::Stripe,
            PaymentMethod::Pix => GatewayKind::Abacatepay,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_gateway", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    Stripe,
    Abacatepay,
}

impl GatewayKind {
    pub fn to_str(&self) -> &str {
        match self {
            GatewayKind::Stripe => "stripe",
            GatewayKind::Abacatepay => "abacatepay",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub service_id: Uuid,
    pub payer_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub gateway: GatewayKind,
    pub gateway_billing_id: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_br_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_br_code_base64: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WebhookEvent {
    pub gateway: GatewayKind,
    pub event_id: String,
    pub event_type: String,
    pub payment_id: Option<Uuid>,
    pub outcome: serde_json::Value,
    pub received_at: DateTime<Utc>,
}
