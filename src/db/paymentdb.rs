use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::paymentmodel::{GatewayKind, Payment, PaymentMethod, PaymentStatus, WebhookEvent},
};

const PAYMENT_COLUMNS: &str = "id, service_id, payer_id, amount_cents, currency, method, gateway, \
     gateway_billing_id, status, client_secret, pix_br_code, pix_br_code_base64, expires_at, \
     paid_at, created_at, updated_at";

pub struct NewPayment {
    pub service_id: Uuid,
    pub payer_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub gateway: GatewayKind,
    pub gateway_billing_id: String,
    pub client_secret: Option<String>,
    pub pix_br_code: Option<String>,
    pub pix_br_code_base64: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of recording a gateway event.
#[derive(Debug)]
pub struct WebhookRecord {
    /// The event id had already been processed; `outcome` is the stored one.
    pub replayed: bool,
    pub outcome: serde_json::Value,
    /// Set only when this delivery moved the payment.
    pub transitioned: Option<Payment>,
}

#[async_trait]
pub trait PaymentExt {
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, Error>;

    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;

    /// Pending or paid payment for the service, if any.
    async fn get_active_service_payment(&self, service_id: Uuid) -> Result<Option<Payment>, Error>;

    /// `pending -> to`. `None` when the payment had already left pending.
    async fn transition_payment(
        &self,
        payment_id: Uuid,
        to: PaymentStatus,
    ) -> Result<Option<Payment>, Error>;

    async fn sum_paid_for_provider(&self, provider_id: Uuid) -> Result<i64, Error>;

    async fn sum_paid_by_client(&self, client_id: Uuid) -> Result<i64, Error>;

    /// Records a gateway event and applies its status, once per
    /// (gateway, event id). Dedup row, status change and outcome commit
    /// together.
    async fn apply_webhook_event(
        &self,
        gateway: GatewayKind,
        event_id: &str,
        event_type: &str,
        billing_id: Option<&str>,
        target: Option<PaymentStatus>,
    ) -> Result<WebhookRecord, Error>;
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, Error> {
        let sql = format!(
            r#"
            INSERT INTO payments
            (service_id, payer_id, amount_cents, currency, method, gateway, gateway_billing_id,
             client_secret, pix_br_code, pix_br_code_base64, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );

        sqlx::query_as::<_, Payment>(&sql)
            .bind(payment.service_id)
            .bind(payment.payer_id)
            .bind(payment.amount_cents)
            .bind(payment.currency)
            .bind(payment.method)
            .bind(payment.gateway)
            .bind(payment.gateway_billing_id)
            .bind(payment.client_secret)
            .bind(payment.pix_br_code)
            .bind(payment.pix_br_code_base64)
            .bind(payment.expires_at)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        let sql = format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS);

        sqlx::query_as::<_, Payment>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_active_service_payment(&self, service_id: Uuid) -> Result<Option<Payment>, Error> {
        let sql = format!(
            r#"
            SELECT {} FROM payments
            WHERE service_id = $1 AND status IN ('pending', 'paid')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            PAYMENT_COLUMNS
        );

        sqlx::query_as::<_, Payment>(&sql)
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn transition_payment(
        &self,
        payment_id: Uuid,
        to: PaymentStatus,
    ) -> Result<Option<Payment>, Error> {
        let sql = format!(
            r#"
            UPDATE payments
            SET status = $2,
                paid_at = CASE WHEN $2 = 'paid'::payment_status THEN NOW() ELSE paid_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );

        sqlx::query_as::<_, Payment>(&sql)
            .bind(payment_id)
            .bind(to)
            .fetch_optional(&self.pool)
            .await
    }

    async fn sum_paid_for_provider(&self, provider_id: Uuid) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(p.amount_cents), 0)::BIGINT
            FROM payments p
            JOIN services s ON s.id = p.service_id
            WHERE s.provider_id = $1 AND p.status = 'paid'
            "#,
        )
        .bind(provider_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn sum_paid_by_client(&self, client_id: Uuid) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)::BIGINT
            FROM payments
            WHERE payer_id = $1 AND status = 'paid'
            "#,
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn apply_webhook_event(
        &self,
        gateway: GatewayKind,
        event_id: &str,
        event_type: &str,
        billing_id: Option<&str>,
        target: Option<PaymentStatus>,
    ) -> Result<WebhookRecord, Error> {
        let mut tx = self.pool.begin().await?;

        let claimed: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO webhook_events (gateway, event_id, event_type, outcome)
            VALUES ($1, $2, $3, '{}'::jsonb)
            ON CONFLICT (gateway, event_id) DO NOTHING
            RETURNING event_id
            "#,
        )
        .bind(gateway)
        .bind(event_id)
        .bind(event_type)
        .fetch_optional(&mut *tx)
        .await?;

        if claimed.is_none() {
            let previous = sqlx::query_as::<_, WebhookEvent>(
                r#"
                SELECT gateway, event_id, event_type, payment_id, outcome, received_at
                FROM webhook_events
                WHERE gateway = $1 AND event_id = $2
                "#,
            )
            .bind(gateway)
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;

            tracing::info!(
                "{} webhook event {} replayed (first seen {}); no-op",
                gateway.to_str(),
                previous.event_id,
                previous.received_at
            );
            return Ok(WebhookRecord {
                replayed: true,
                outcome: previous.outcome,
                transitioned: None,
            });
        }

        let payment = match billing_id {
            Some(billing_id) => {
                let sql = format!(
                    r#"
                    SELECT {} FROM payments
                    WHERE gateway = $1 AND gateway_billing_id = $2
                    FOR UPDATE
                    "#,
                    PAYMENT_COLUMNS
                );
                sqlx::query_as::<_, Payment>(&sql)
                    .bind(gateway)
                    .bind(billing_id)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            None => None,
        };

        let Some(payment) = payment else {
            // not recorded, so a later delivery can still settle the billing
            tx.rollback().await?;
            tracing::warn!(
                "{} webhook event {} for unknown billing {:?}; not recorded",
                gateway.to_str(),
                event_id,
                billing_id
            );
            return Ok(WebhookRecord {
                replayed: false,
                outcome: serde_json::json!({
                    "status": "ignored",
                    "reason": "unknown billing",
                    "billing_id": billing_id,
                }),
                transitioned: None,
            });
        };

        let mut transitioned = None;
        let outcome = match target {
            None => serde_json::json!({
                "status": "ignored",
                "reason": "unhandled event",
                "payment_id": payment.id,
            }),
            Some(to) if payment.status.can_transition_to(to) => {
                let sql = format!(
                    r#"
                    UPDATE payments
                    SET status = $2,
                        paid_at = CASE WHEN $2 = 'paid'::payment_status THEN NOW() ELSE paid_at END,
                        updated_at = NOW()
                    WHERE id = $1
                    RETURNING {}
                    "#,
                    PAYMENT_COLUMNS
                );
                let updated = sqlx::query_as::<_, Payment>(&sql)
                    .bind(payment.id)
                    .bind(to)
                    .fetch_one(&mut *tx)
                    .await?;

                let outcome = serde_json::json!({
                    "status": "applied",
                    "payment_id": updated.id,
                    "from": payment.status.to_str(),
                    "to": updated.status.to_str(),
                });
                transitioned = Some(updated);
                outcome
            }
            Some(to) => serde_json::json!({
                "status": "unchanged",
                "payment_id": payment.id,
                "current": payment.status.to_str(),
                "requested": to.to_str(),
            }),
        };

        sqlx::query(
            r#"
            UPDATE webhook_events
            SET outcome = $3, payment_id = $4
            WHERE gateway = $1 AND event_id = $2
            "#,
        )
        .bind(gateway)
        .bind(event_id)
        .bind(&outcome)
        .bind(payment.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(WebhookRecord {
            replayed: false,
            outcome,
            transitioned,
        })
    }
}
