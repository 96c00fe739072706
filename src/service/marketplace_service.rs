// service/marketplace_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        servicedb::{NewService, ServicesExt},
    },
    dtos::PaginatedResponse,
    models::{
        servicemodel::{Service, ServiceStatus},
        usermodel::UserRole,
    },
    service::{
        access_control::Caller, error::ServiceError, notification_service::NotificationService,
    },
};

/// Who may drive a direct status change.
pub fn authorize_transition(
    service: &Service,
    caller_id: Uuid,
    to: ServiceStatus,
) -> Result<(), ServiceError> {
    let from = service.status;
    if from.is_terminal() || !from.can_transition_to(to) {
        return Err(ServiceError::InvalidTransition {
            from: from.to_str().to_string(),
            to: to.to_str().to_string(),
        });
    }

    let is_client = service.client_id == caller_id;
    let is_provider = service.provider_id == Some(caller_id);

    let allowed = match (from, to) {
        (ServiceStatus::Pending, ServiceStatus::Cancelled)
        | (ServiceStatus::Accepted, ServiceStatus::Cancelled) => is_client,
        (ServiceStatus::Accepted, ServiceStatus::InProgress) => is_provider,
        (ServiceStatus::InProgress, ServiceStatus::Completed) => is_client || is_provider,
        _ => false,
    };

    if !allowed {
        return Err(ServiceError::Forbidden(format!(
            "You cannot move this service to {}",
            to.to_str()
        )));
    }

    Ok(())
}

/// Read access: participants, staff, and providers browsing open services.
pub fn can_view(caller: &Caller, service: &Service) -> bool {
    service.is_participant(caller.id)
        || caller.role.is_staff()
        || (caller.role >= UserRole::Provider
            && service.provider_id.is_none()
            && service.status == ServiceStatus::Pending)
}

#[derive(Debug, Clone)]
pub struct MarketplaceService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
}

impl MarketplaceService {
    pub fn new(db_client: Arc<DBClient>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            db_client,
            notification_service,
        }
    }

    pub async fn create_service(&self, service: NewService) -> Result<Service, ServiceError> {
        let service = self.db_client.create_service(service).await?;
        tracing::info!("client {} posted service {}", service.client_id, service.id);
        Ok(service)
    }

    /// One page of the services the caller may see, with the total count.
    pub async fn list_services(
        &self,
        caller: &Caller,
        status: Option<ServiceStatus>,
        page: u32,
        limit: u32,
    ) -> Result<PaginatedResponse<Service>, ServiceError> {
        let db = &self.db_client;

        let (services, total) = if caller.role.is_staff() {
            (
                db.get_all_services(status, page, limit).await?,
                db.count_services(status).await?,
            )
        } else if caller.role == UserRole::Provider {
            (
                db.get_provider_services(caller.id, status, page, limit).await?,
                db.count_provider_services(caller.id, status).await?,
            )
        } else {
            (
                db.get_client_services(caller.id, status, page, limit).await?,
                db.count_client_services(caller.id, status).await?,
            )
        };

        Ok(PaginatedResponse::new(services, total, page, limit))
    }

    pub async fn get_service(&self, caller: &Caller, service_id: Uuid) -> Result<Service, ServiceError> {
        let service = self
            .db_client
            .get_service(service_id)
            .await?
            .ok_or(ServiceError::ServiceNotFound(service_id))?;

        if !can_view(caller, &service) {
            return Err(ServiceError::Forbidden(
                "You do not have access to this service".to_string(),
            ));
        }

        Ok(service)
    }

    pub async fn update_status(
        &self,
        caller_id: Uuid,
        service_id: Uuid,
        to: ServiceStatus,
    ) -> Result<Service, ServiceError> {
        let service = self
            .db_client
            .get_service(service_id)
            .await?
            .ok_or(ServiceError::ServiceNotFound(service_id))?;

        authorize_transition(&service, caller_id, to)?;

        let updated = self
            .db_client
            .update_service_status(service_id, service.status, to)
            .await?
            .ok_or_else(|| {
                ServiceError::Conflict("Service status changed, reload and try again".to_string())
            })?;

        tracing::info!(
            "service {} moved {} -> {} by {}",
            service_id,
            service.status.to_str(),
            updated.status.to_str(),
            caller_id
        );

        self.notification_service
            .notify_status_change(&updated, caller_id)
            .await;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn service(status: ServiceStatus, client_id: Uuid, provider_id: Option<Uuid>) -> Service {
        Service {
            id: Uuid::new_v4(),
            client_id,
            provider_id,
            title: "Fix the sink".to_string(),
            description: "Leaking under the counter".to_string(),
            category: "repairs".to_string(),
            location: None,
            budget: None,
            final_price: None,
            scheduled_date: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn client_cancels_and_provider_starts() {
        let client = Uuid::new_v4();
        let provider = Uuid::new_v4();

        let pending = service(ServiceStatus::Pending, client, None);
        assert!(authorize_transition(&pending, client, ServiceStatus::Cancelled).is_ok());

        let accepted = service(ServiceStatus::Accepted, client, Some(provider));
        assert!(authorize_transition(&accepted, provider, ServiceStatus::InProgress).is_ok());
        assert!(authorize_transition(&accepted, client, ServiceStatus::Cancelled).is_ok());
        assert!(matches!(
            authorize_transition(&accepted, client, ServiceStatus::InProgress),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_transition(&accepted, provider, ServiceStatus::Cancelled),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn either_participant_completes() {
        let client = Uuid::new_v4();
        let provider = Uuid::new_v4();
        let running = service(ServiceStatus::InProgress, client, Some(provider));

        assert!(authorize_transition(&running, client, ServiceStatus::Completed).is_ok());
        assert!(authorize_transition(&running, provider, ServiceStatus::Completed).is_ok());
        assert!(matches!(
            authorize_transition(&running, Uuid::new_v4(), ServiceStatus::Completed),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn illegal_moves_are_rejected_before_ownership() {
        let client = Uuid::new_v4();
        let pending = service(ServiceStatus::Pending, client, None);

        let err = authorize_transition(&pending, client, ServiceStatus::Accepted).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));

        let done = service(ServiceStatus::Completed, client, Some(Uuid::new_v4()));
        let err = authorize_transition(&done, client, ServiceStatus::Cancelled).unwrap_err();
        assert_eq!(err.to_string(), "Invalid status transition from completed to cancelled");
    }

    #[test]
    fn visibility() {
        let client = Uuid::new_v4();
        let open = service(ServiceStatus::Pending, client, None);
        let taken = service(ServiceStatus::Accepted, client, Some(Uuid::new_v4()));

        let provider = Caller {
            id: Uuid::new_v4(),
            email: "p@servicehub.test".to_string(),
            role: UserRole::Provider,
        };
        let stranger = Caller {
            id: Uuid::new_v4(),
            email: "c@servicehub.test".to_string(),
            role: UserRole::Client,
        };
        let employee = Caller {
            id: Uuid::new_v4(),
            email: "e@servicehub.test".to_string(),
            role: UserRole::Employee,
        };

        assert!(can_view(&provider, &open));
        assert!(!can_view(&provider, &taken));
        assert!(!can_view(&stranger, &open));
        assert!(can_view(&employee, &taken));
    }
}
