// service/notification_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, notificationdb::NotificationExt},
    models::{
        paymentmodel::Payment,
        servicemodel::{Proposal, Service},
    },
    utils::currency::format_centavos,
};

/// Writes in-app notifications. Every method is best-effort: a failed insert
/// is logged and swallowed so the triggering action still succeeds.
#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn notify_new_proposal(&self, service: &Service, proposal: &Proposal) {
        self.store_notification(
            service.client_id,
            "proposal_received",
            "New proposal",
            format!(
                "A provider offered R$ {} for \"{}\"",
                proposal.proposed_price, service.title
            ),
            Some(service.id),
        )
        .await;
    }

    pub async fn notify_proposal_accepted(&self, service: &Service, proposal: &Proposal) {
        self.store_notification(
            proposal.provider_id,
            "proposal_accepted",
            "Proposal accepted",
            format!("Your proposal for \"{}\" was accepted", service.title),
            Some(service.id),
        )
        .await;

        self.store_notification(
            service.client_id,
            "provider_assigned",
            "Provider assigned",
            format!(
                "\"{}\" is now assigned for R$ {}",
                service.title, proposal.proposed_price
            ),
            Some(service.id),
        )
        .await;
    }

    pub async fn notify_proposals_rejected(&self, service: &Service, provider_ids: &[Uuid]) {
        for provider_id in provider_ids {
            self.store_notification(
                *provider_id,
                "proposal_rejected",
                "Proposal not selected",
                format!("The client chose another proposal for \"{}\"", service.title),
                Some(service.id),
            )
            .await;
        }
    }

    pub async fn notify_status_change(&self, service: &Service, actor_id: Uuid) {
        let recipients = [Some(service.client_id), service.provider_id];
        for user_id in recipients.into_iter().flatten().filter(|id| *id != actor_id) {
            self.store_notification(
                user_id,
                "service_status",
                "Service updated",
                format!("\"{}\" is now {}", service.title, service.status.to_str()),
                Some(service.id),
            )
            .await;
        }
    }

    pub async fn notify_payment_paid(&self, service: &Service, payment: &Payment) {
        let amount = format_centavos(payment.amount_cents);

        self.store_notification(
            payment.payer_id,
            "payment_confirmed",
            "Payment confirmed",
            format!("Your payment of {} for \"{}\" was confirmed", amount, service.title),
            Some(service.id),
        )
        .await;

        if let Some(provider_id) = service.provider_id {
            self.store_notification(
                provider_id,
                "payment_received",
                "Payment received",
                format!("The client paid {} for \"{}\"", amount, service.title),
                Some(service.id),
            )
            .await;
        }
    }

    /// Puts a scheduled service on both participants' calendars.
    pub async fn schedule_service(&self, service: &Service) {
        let Some(starts_at) = service.scheduled_date else {
            return;
        };

        let attendees = [Some(service.client_id), service.provider_id];
        for user_id in attendees.into_iter().flatten() {
            if let Err(e) = self
                .db_client
                .create_calendar_event(user_id, Some(service.id), &service.title, starts_at, None)
                .await
            {
                tracing::warn!(
                    "failed to add service {} to calendar of {}: {}",
                    service.id,
                    user_id,
                    e
                );
            }
        }
    }

    async fn store_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        title: &str,
        message: String,
        service_id: Option<Uuid>,
    ) {
        tracing::info!("notification {} -> user {}", kind, user_id);

        if let Err(e) = self
            .db_client
            .create_notification(user_id, kind, title, &message, service_id)
            .await
        {
            tracing::warn!("failed to store {} notification for {}: {}", kind, user_id, e);
        }
    }
}
