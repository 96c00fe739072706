// service/payment_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        paymentdb::{NewPayment, PaymentExt},
        servicedb::ServicesExt,
    },
    models::{
        paymentmodel::{GatewayKind, Payment, PaymentMethod, PaymentStatus},
        servicemodel::{Service, ServiceStatus},
    },
    service::{
        access_control::Caller,
        error::ServiceError,
        notification_service::NotificationService,
        payment_provider::PaymentProviderService,
        webhook::GatewayEvent,
    },
    utils::currency::{reais_to_centavos, CURRENCY},
};

/// Checks that `service` can be charged to `payer_id` and returns the amount
/// in centavos.
pub fn payable_amount(service: &Service, payer_id: Uuid) -> Result<i64, ServiceError> {
    if service.client_id != payer_id {
        return Err(ServiceError::Forbidden(
            "Only the client who posted the service can pay for it".to_string(),
        ));
    }

    if !matches!(service.status, ServiceStatus::Accepted | ServiceStatus::InProgress) {
        return Err(ServiceError::Validation(format!(
            "A {} service cannot be paid",
            service.status.to_str()
        )));
    }

    let price = service.final_price.as_ref().ok_or_else(|| {
        ServiceError::Validation("Service has no agreed price yet".to_string())
    })?;

    reais_to_centavos(price)
        .ok_or_else(|| ServiceError::Validation("Service price must be positive".to_string()))
}

pub fn can_view_payment(caller: &Caller, payment: &Payment, service: &Service) -> bool {
    payment.payer_id == caller.id || service.provider_id == Some(caller.id) || caller.role.is_staff()
}

#[derive(Debug, Clone)]
pub struct PaymentService {
    db_client: Arc<DBClient>,
    provider: Arc<PaymentProviderService>,
    notification_service: Arc<NotificationService>,
}

impl PaymentService {
    pub fn new(
        db_client: Arc<DBClient>,
        provider: Arc<PaymentProviderService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            provider,
            notification_service,
        }
    }

    pub async fn create_payment(
        &self,
        payer_id: Uuid,
        service_id: Uuid,
        method: PaymentMethod,
    ) -> Result<Payment, ServiceError> {
        let service = self
            .db_client
            .get_service(service_id)
            .await?
            .ok_or(ServiceError::ServiceNotFound(service_id))?;

        let amount_cents = payable_amount(&service, payer_id)?;

        if let Some(existing) = self.db_client.get_active_service_payment(service_id).await? {
            return Err(match existing.status {
                PaymentStatus::Paid => {
                    ServiceError::Validation("Service has already been paid".to_string())
                }
                _ => ServiceError::Conflict(format!(
                    "Payment {} is already pending for this service",
                    existing.id
                )),
            });
        }

        let checkout = self
            .provider
            .create_checkout(method, amount_cents, service_id, &service.title)
            .await?;

        let payment = self
            .db_client
            .create_payment(NewPayment {
                service_id,
                payer_id,
                amount_cents,
                currency: CURRENCY.to_string(),
                method,
                gateway: method.gateway(),
                gateway_billing_id: checkout.billing_id,
                client_secret: checkout.client_secret,
                pix_br_code: checkout.pix_br_code,
                pix_br_code_base64: checkout.pix_br_code_base64,
                expires_at: checkout.expires_at,
            })
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => ServiceError::Conflict(
                    "Another payment for this service was just started".to_string(),
                ),
                other => ServiceError::Database(other),
            })?;

        tracing::info!(
            "payment {} created for service {} via {} ({} centavos)",
            payment.id,
            service_id,
            payment.gateway.to_str(),
            amount_cents
        );

        Ok(payment)
    }

    /// Current payment state, refreshed from the gateway while it is pending.
    pub async fn get_status(&self, caller: &Caller, payment_id: Uuid) -> Result<Payment, ServiceError> {
        let payment = self
            .db_client
            .get_payment(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        let service = self
            .db_client
            .get_service(payment.service_id)
            .await?
            .ok_or(ServiceError::ServiceNotFound(payment.service_id))?;

        if !can_view_payment(caller, &payment, &service) {
            return Err(ServiceError::Forbidden(
                "You do not have access to this payment".to_string(),
            ));
        }

        if payment.status.is_terminal() {
            return Ok(payment);
        }

        let remote = match self
            .provider
            .fetch_status(payment.gateway, &payment.gateway_billing_id)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("status refresh for payment {} failed: {}", payment.id, e);
                return Ok(payment);
            }
        };

        if !payment.status.can_transition_to(remote) {
            return Ok(payment);
        }

        match self.db_client.transition_payment(payment.id, remote).await? {
            Some(updated) => {
                tracing::info!("payment {} refreshed to {}", updated.id, updated.status.to_str());
                if updated.status == PaymentStatus::Paid {
                    self.notification_service
                        .notify_payment_paid(&service, &updated)
                        .await;
                }
                Ok(updated)
            }
            // a webhook moved it first
            None => self
                .db_client
                .get_payment(payment_id)
                .await?
                .ok_or(ServiceError::PaymentNotFound(payment_id)),
        }
    }

    pub async fn cancel_payment(&self, caller_id: Uuid, payment_id: Uuid) -> Result<Payment, ServiceError> {
        let payment = self
            .db_client
            .get_payment(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        if payment.payer_id != caller_id {
            return Err(ServiceError::Forbidden(
                "Only the payer can cancel this payment".to_string(),
            ));
        }

        if !payment.status.can_transition_to(PaymentStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition {
                from: payment.status.to_str().to_string(),
                to: PaymentStatus::Cancelled.to_str().to_string(),
            });
        }

        self.provider
            .cancel(payment.gateway, &payment.gateway_billing_id)
            .await?;

        let cancelled = self
            .db_client
            .transition_payment(payment.id, PaymentStatus::Cancelled)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Payment is no longer pending".to_string()))?;

        tracing::info!("payment {} cancelled by {}", cancelled.id, caller_id);
        Ok(cancelled)
    }

    /// Applies a verified gateway event once; replays return the first outcome.
    pub async fn handle_webhook(
        &self,
        gateway: GatewayKind,
        event: GatewayEvent,
    ) -> Result<serde_json::Value, ServiceError> {
        let record = self
            .db_client
            .apply_webhook_event(
                gateway,
                &event.event_id,
                &event.event_type,
                event.billing_id.as_deref(),
                event.target_status,
            )
            .await?;

        tracing::info!(
            "{} webhook {} ({}): {}",
            gateway.to_str(),
            event.event_id,
            event.event_type,
            record.outcome
        );

        if let Some(payment) = record
            .transitioned
            .as_ref()
            .filter(|p| p.status == PaymentStatus::Paid)
        {
            match self.db_client.get_service(payment.service_id).await {
                Ok(Some(service)) => {
                    self.notification_service
                        .notify_payment_paid(&service, payment)
                        .await
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("could not load service for paid payment {}: {}", payment.id, e),
            }
        }

        Ok(serde_json::json!({
            "received": true,
            "replayed": record.replayed,
            "outcome": record.outcome,
        }))
    }
}
