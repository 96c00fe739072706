// service/audit_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, userdb::UserExt},
    models::usermodel::{Profile, UserRole},
};

/// Admin action trail. Writes never fail the admin request that triggered them.
#[derive(Debug, Clone)]
pub struct AuditService {
    db_client: Arc<DBClient>,
}

impl AuditService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn log_user_created(&self, admin_id: Uuid, profile: &Profile) {
        self.log_audit_event(
            admin_id,
            "user_created",
            Some(profile.id),
            serde_json::json!({
                "email": profile.email,
                "role": profile.role.to_str(),
            }),
        )
        .await;
    }

    pub async fn log_role_changed(
        &self,
        admin_id: Uuid,
        target_id: Uuid,
        from: UserRole,
        to: UserRole,
    ) {
        self.log_audit_event(
            admin_id,
            "role_changed",
            Some(target_id),
            serde_json::json!({
                "from": from.to_str(),
                "to": to.to_str(),
            }),
        )
        .await;
    }

    pub async fn log_user_deleted(&self, admin_id: Uuid, profile: &Profile) {
        self.log_audit_event(
            admin_id,
            "user_deleted",
            Some(profile.id),
            serde_json::json!({ "email": profile.email }),
        )
        .await;
    }

    async fn log_audit_event(
        &self,
        admin_id: Uuid,
        action: &str,
        target_user_id: Option<Uuid>,
        details: serde_json::Value,
    ) {
        if let Err(e) = self
            .db_client
            .insert_audit_log(admin_id, action, target_user_id, Some(details))
            .await
        {
            tracing::warn!("audit log write failed for {} by {}: {}", action, admin_id, e);
        }
    }
}
