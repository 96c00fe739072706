// service/admin_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, userdb::UserExt},
    models::usermodel::{Profile, UserRole},
    service::{audit_service::AuditService, auth_provider::AuthProviderClient, error::ServiceError},
};

pub fn check_assignable(role: UserRole) -> Result<(), ServiceError> {
    if role == UserRole::Visitor {
        return Err(ServiceError::Validation(
            "visitor is not an assignable role".to_string(),
        ));
    }
    Ok(())
}

/// Admins may not lower their own role.
pub fn check_role_change(admin_id: Uuid, target_id: Uuid, role: UserRole) -> Result<(), ServiceError> {
    check_assignable(role)?;
    if admin_id == target_id && role != UserRole::Admin {
        return Err(ServiceError::Validation(
            "You cannot remove your own admin role".to_string(),
        ));
    }
    Ok(())
}

pub fn check_deletion(admin_id: Uuid, target_id: Uuid) -> Result<(), ServiceError> {
    if admin_id == target_id {
        return Err(ServiceError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AdminService {
    db_client: Arc<DBClient>,
    auth_provider: Arc<AuthProviderClient>,
    audit_service: Arc<AuditService>,
}

impl AdminService {
    pub fn new(
        db_client: Arc<DBClient>,
        auth_provider: Arc<AuthProviderClient>,
        audit_service: Arc<AuditService>,
    ) -> Self {
        Self {
            db_client,
            auth_provider,
            audit_service,
        }
    }

    pub async fn create_user(
        &self,
        admin_id: Uuid,
        email: &str,
        password: &str,
        full_name: Option<String>,
        phone: Option<String>,
        role: UserRole,
    ) -> Result<Profile, ServiceError> {
        check_assignable(role)?;

        let auth_user = self
            .auth_provider
            .create_user(email, password, full_name.as_deref(), role)
            .await?;

        let email = auth_user.email.unwrap_or_else(|| email.to_string());
        let profile = match self
            .db_client
            .ensure_profile(auth_user.id, &email, full_name, phone, role)
            .await
        {
            Ok((profile, _)) => profile,
            Err(e) => {
                // keep the auth provider and profiles in step
                if let Err(cleanup) = self.auth_provider.delete_user(auth_user.id).await {
                    tracing::warn!("orphaned auth user {} left behind: {}", auth_user.id, cleanup);
                }
                return Err(e.into());
            }
        };

        tracing::info!("admin {} created user {} as {}", admin_id, profile.id, role.to_str());
        self.audit_service.log_user_created(admin_id, &profile).await;

        Ok(profile)
    }

    pub async fn update_role(
        &self,
        admin_id: Uuid,
        target_id: Uuid,
        role: UserRole,
    ) -> Result<Profile, ServiceError> {
        check_role_change(admin_id, target_id, role)?;

        let current = self
            .db_client
            .get_profile(target_id)
            .await?
            .ok_or(ServiceError::UserNotFound(target_id))?;

        let updated = self
            .db_client
            .update_profile_role(target_id, role)
            .await?
            .ok_or(ServiceError::UserNotFound(target_id))?;

        if let Err(e) = self.auth_provider.update_user_type(target_id, role).await {
            tracing::warn!("user_type sync for {} failed: {}", target_id, e);
        }

        self.audit_service
            .log_role_changed(admin_id, target_id, current.role, updated.role)
            .await;

        Ok(updated)
    }

    pub async fn delete_user(&self, admin_id: Uuid, target_id: Uuid) -> Result<Profile, ServiceError> {
        check_deletion(admin_id, target_id)?;

        let profile = self
            .db_client
            .get_profile(target_id)
            .await?
            .ok_or(ServiceError::UserNotFound(target_id))?;

        self.auth_provider.delete_user(target_id).await?;
        self.db_client.delete_profile(target_id).await?;

        tracing::info!("admin {} deleted user {}", admin_id, target_id);
        self.audit_service.log_user_deleted(admin_id, &profile).await;

        Ok(profile)
    }
}
