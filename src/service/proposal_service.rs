// service/proposal_service.rs
use std::sync::Arc;

use serde::Serialize;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, proposaldb::ProposalExt, servicedb::ServicesExt},
    models::{
        servicemodel::{Proposal, ProposalStatus, Service, ServiceStatus},
        usermodel::UserRole,
    },
    service::{
        access_control::Caller, error::ServiceError, notification_service::NotificationService,
    },
};

/// What accepting a proposal will write, decided on the locked rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptancePlan {
    pub service_id: Uuid,
    pub proposal_id: Uuid,
    pub provider_id: Uuid,
    pub final_price: BigDecimal,
    /// Sibling proposals still in `new`.
    pub reject_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AcceptanceOutcome {
    pub service: Service,
    pub proposal: Proposal,
    pub rejected_proposal_ids: Vec<Uuid>,
    #[serde(skip)]
    pub rejected_provider_ids: Vec<Uuid>,
}

/// Checks the acceptance preconditions against `service` and all of its
/// `proposals`, in the order the API reports them.
pub fn plan_acceptance(
    caller_id: Uuid,
    service: &Service,
    proposals: &[Proposal],
    proposal_id: Uuid,
) -> Result<AcceptancePlan, ServiceError> {
    let proposal = proposals
        .iter()
        .find(|p| p.id == proposal_id && p.service_id == service.id)
        .ok_or(ServiceError::ProposalNotFound(proposal_id))?;

    if service.client_id != caller_id {
        return Err(ServiceError::Forbidden(
            "Only the client who posted the service can accept proposals".to_string(),
        ));
    }

    if service.provider_id.is_some() {
        return Err(ServiceError::Validation(
            "Service already has an assigned provider".to_string(),
        ));
    }

    if service.status != ServiceStatus::Pending {
        return Err(ServiceError::Validation(format!(
            "Service is {} and no longer accepts proposals",
            service.status.to_str()
        )));
    }

    if proposal.status != ProposalStatus::New {
        return Err(ServiceError::Validation(format!(
            "Proposal is already {}",
            proposal.status.to_str()
        )));
    }

    let reject_ids = proposals
        .iter()
        .filter(|p| p.id != proposal.id && p.status == ProposalStatus::New)
        .map(|p| p.id)
        .collect();

    Ok(AcceptancePlan {
        service_id: service.id,
        proposal_id: proposal.id,
        provider_id: proposal.provider_id,
        final_price: proposal.proposed_price.clone(),
        reject_ids,
    })
}

/// Bidding rules for a provider on `service`.
pub fn check_can_bid(caller: &Caller, service: &Service) -> Result<(), ServiceError> {
    if caller.role < UserRole::Provider {
        return Err(ServiceError::Forbidden(
            "Only providers can submit proposals".to_string(),
        ));
    }

    if service.client_id == caller.id {
        return Err(ServiceError::Validation(
            "You cannot submit a proposal for your own service".to_string(),
        ));
    }

    if service.provider_id.is_some() || service.status != ServiceStatus::Pending {
        return Err(ServiceError::Validation(
            "Service is no longer open for proposals".to_string(),
        ));
    }

    Ok(())
}

fn duplicate_proposal() -> ServiceError {
    ServiceError::Conflict("You already have an open proposal for this service".to_string())
}

#[derive(Debug, Clone)]
pub struct ProposalService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
}

impl ProposalService {
    pub fn new(db_client: Arc<DBClient>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            db_client,
            notification_service,
        }
    }

    pub async fn submit_proposal(
        &self,
        caller: &Caller,
        service_id: Uuid,
        proposed_price: BigDecimal,
        description: String,
        estimated_duration: Option<String>,
    ) -> Result<Proposal, ServiceError> {
        let service = self
            .db_client
            .get_service(service_id)
            .await?
            .ok_or(ServiceError::ServiceNotFound(service_id))?;

        check_can_bid(caller, &service)?;

        if self.db_client.has_open_proposal(service_id, caller.id).await? {
            return Err(duplicate_proposal());
        }

        // concurrent submissions are caught by the open-proposal unique index
        let proposal = self
            .db_client
            .create_proposal(
                service_id,
                caller.id,
                proposed_price,
                description,
                estimated_duration,
            )
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => duplicate_proposal(),
                other => ServiceError::Database(other),
            })?;

        tracing::info!(
            "provider {} submitted proposal {} for service {}",
            caller.id,
            proposal.id,
            service_id
        );

        self.notification_service
            .notify_new_proposal(&service, &proposal)
            .await;

        Ok(proposal)
    }

    pub async fn list_proposals(
        &self,
        caller: &Caller,
        service_id: Option<Uuid>,
    ) -> Result<Vec<Proposal>, ServiceError> {
        let Some(service_id) = service_id else {
            if caller.role < UserRole::Provider {
                return Err(ServiceError::Validation(
                    "service_id is required".to_string(),
                ));
            }
            return Ok(self.db_client.get_provider_proposals(caller.id, None).await?);
        };

        let service = self
            .db_client
            .get_service(service_id)
            .await?
            .ok_or(ServiceError::ServiceNotFound(service_id))?;

        if service.client_id == caller.id || caller.role.is_staff() {
            return Ok(self.db_client.get_service_proposals(service_id).await?);
        }

        if caller.role >= UserRole::Provider {
            return Ok(self
                .db_client
                .get_provider_proposals(caller.id, Some(service_id))
                .await?);
        }

        Err(ServiceError::Forbidden(
            "You cannot view proposals for this service".to_string(),
        ))
    }

    pub async fn accept_proposal(
        &self,
        caller_id: Uuid,
        proposal_id: Uuid,
    ) -> Result<AcceptanceOutcome, ServiceError> {
        let outcome = self.db_client.accept_proposal(proposal_id, caller_id).await?;

        self.notification_service
            .notify_proposal_accepted(&outcome.service, &outcome.proposal)
            .await;
        self.notification_service
            .notify_proposals_rejected(&outcome.service, &outcome.rejected_provider_ids)
            .await;
        self.notification_service
            .schedule_service(&outcome.service)
            .await;

        Ok(outcome)
    }

    pub async fn reject_proposal(
        &self,
        caller_id: Uuid,
        proposal_id: Uuid,
    ) -> Result<Proposal, ServiceError> {
        let proposal = self
            .db_client
            .get_proposal(proposal_id)
            .await?
            .ok_or(ServiceError::ProposalNotFound(proposal_id))?;

        let service = self
            .db_client
            .get_service(proposal.service_id)
            .await?
            .ok_or(ServiceError::ServiceNotFound(proposal.service_id))?;

        if service.client_id != caller_id {
            return Err(ServiceError::Forbidden(
                "Only the client who posted the service can reject proposals".to_string(),
            ));
        }

        if proposal.status != ProposalStatus::New {
            return Err(ServiceError::Validation(format!(
                "Proposal is already {}",
                proposal.status.to_str()
            )));
        }

        let rejected = self
            .db_client
            .reject_proposal(proposal_id)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Proposal is no longer open".to_string()))?;

        self.notification_service
            .notify_proposals_rejected(&service, &[rejected.provider_id])
            .await;

        Ok(rejected)
    }
}
