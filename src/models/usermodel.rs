use chrono::prelude::*;
use serde::{Deserialize, Serialize};

/// Coarse caller role. Variants are declared in ascending privilege, so the
/// derived ordering is the access hierarchy: an admin can reach anything an
/// employee can, an employee anything a provider can, and so on.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Visitor,
    Client,
    Provider,
    Employee,
    Admin,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Visitor => "visitor",
            UserRole::Client => "client",
            UserRole::Provider => "provider",
            UserRole::Employee => "employee",
            UserRole::Admin => "admin",
        }
    }

    /// Parses the `user_type` carried in session metadata. Visitor is never a
    /// stored user type.
    pub fn from_user_type(value: &str) -> Option<UserRole> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" => Some(UserRole::Client),
            "provider" => Some(UserRole::Provider),
            "employee" => Some(UserRole::Employee),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    pub fn dashboard_path(&self) -> &'static str {
        match self {
            UserRole::Admin => "/admin/dashboard",
            UserRole::Employee => "/employee/dashboard",
            UserRole::Provider => "/provider/dashboard",
            UserRole::Client | UserRole::Visitor => "/client/dashboard",
        }
    }

    pub fn is_staff(&self) -> bool {
        *self >= UserRole::Employee
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Profile {
    pub id: uuid::Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdminAuditEntry {
    pub id: uuid::Uuid,
    pub admin_id: uuid::Uuid,
    pub action: String,
    pub target_user_id: Option<uuid::Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_privilege() {
        assert!(UserRole::Admin > UserRole::Employee);
        assert!(UserRole::Employee > UserRole::Provider);
        assert!(UserRole::Provider > UserRole::Client);
        assert!(UserRole::Client > UserRole::Visitor);
    }

    #[test]
    fn user_type_parsing_ignores_case_and_rejects_visitor() {
        assert_eq!(UserRole::from_user_type("Provider"), Some(UserRole::Provider));
        assert_eq!(UserRole::from_user_type(" client "), Some(UserRole::Client));
        assert_eq!(UserRole::from_user_type("visitor"), None);
        assert_eq!(UserRole::from_user_type(""), None);
    }

    #[test]
    fn dashboards_follow_role() {
        assert_eq!(UserRole::Admin.dashboard_path(), "/admin/dashboard");
        assert_eq!(UserRole::Provider.dashboard_path(), "/provider/dashboard");
        assert_eq!(UserRole::Visitor.dashboard_path(), "/client/dashboard");
    }
}
