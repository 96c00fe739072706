// service/access_control.rs
use uuid::Uuid;

use crate::{config::AccessConfig, models::usermodel::UserRole};

#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToLogin,
    RedirectToDashboard(UserRole),
}

const PUBLIC_PATHS: &[&str] = &["/", "/health", "/login", "/register", "/auth/callback"];

const PUBLIC_PREFIXES: &[&str] = &["/api/health", "/api/payments/webhook"];

/// Admin allow-list first, then the session's user type. Authenticated callers
/// without a recognised user type are clients.
pub fn resolve_role(access: &AccessConfig, email: Option<&str>, user_type: Option<&str>) -> UserRole {
    if let Some(email) = email {
        if access.is_admin_email(email) {
            return UserRole::Admin;
        }
    }

    user_type
        .and_then(UserRole::from_user_type)
        .unwrap_or(UserRole::Client)
}

pub fn can_access(role: UserRole, required: UserRole) -> bool {
    role != UserRole::Visitor && role >= required
}

fn strip_api(path: &str) -> &str {
    match path.strip_prefix("/api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

pub fn is_public(path: &str) -> bool {
    let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };

    PUBLIC_PATHS.contains(&path)
        || PUBLIC_PREFIXES
            .iter()
            .any(|prefix| path == *prefix || path.starts_with(&format!("{}/", prefix)))
}

/// Role demanded by the first path segment, with or without the `/api` prefix.
pub fn required_role(path: &str) -> Option<UserRole> {
    let first = strip_api(path)
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or("");

    match first {
        "admin" => Some(UserRole::Admin),
        "employee" => Some(UserRole::Employee),
        "provider" => Some(UserRole::Provider),
        "client" => Some(UserRole::Client),
        _ => None,
    }
}

pub fn decide(path: &str, caller: Option<&Caller>) -> GateDecision {
    if is_public(path) {
        return GateDecision::Allow;
    }

    let caller = match caller {
        Some(caller) if caller.role != UserRole::Visitor => caller,
        _ => return GateDecision::RedirectToLogin,
    };

    match required_role(path) {
        Some(required) if !can_access(caller.role, required) => {
            GateDecision::RedirectToDashboard(caller.role)
        }
        _ => GateDecision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: UserRole) -> Caller {
        Caller {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn hierarchy_is_totally_ordered() {
        use UserRole::*;

        assert!(can_access(Admin, Provider));
        assert!(can_access(Employee, Provider));
        assert!(can_access(Provider, Provider));
        assert!(!can_access(Client, Provider));

        for role in [Client, Provider, Employee, Admin] {
            assert!(can_access(role, Client), "{:?} should reach client paths", role);
        }
        assert!(!can_access(Visitor, Client));
        assert!(!can_access(Visitor, Visitor));

        assert!(can_access(Admin, Admin));
        assert!(!can_access(Employee, Admin));
    }

    #[test]
    fn allow_list_wins_over_user_type() {
        let access = AccessConfig::new(["boss@example.com"]);

        assert_eq!(
            resolve_role(&access, Some("Boss@Example.com"), Some("client")),
            UserRole::Admin
        );
        assert_eq!(
            resolve_role(&access, Some("pro@example.com"), Some("provider")),
            UserRole::Provider
        );
        assert_eq!(
            resolve_role(&access, Some("pro@example.com"), Some("unknown")),
            UserRole::Client
        );
        assert_eq!(resolve_role(&access, None, None), UserRole::Client);
    }

    #[test]
    fn user_type_admin_is_honoured_without_allow_list() {
        let access = AccessConfig::default();
        assert_eq!(resolve_role(&access, Some("x@example.com"), Some("admin")), UserRole::Admin);
    }

    #[test]
    fn route_table() {
        assert_eq!(required_role("/api/admin/users"), Some(UserRole::Admin));
        assert_eq!(required_role("/admin/dashboard"), Some(UserRole::Admin));
        assert_eq!(required_role("/api/provider/dashboard"), Some(UserRole::Provider));
        assert_eq!(required_role("/employee"), Some(UserRole::Employee));
        assert_eq!(required_role("/client/dashboard"), Some(UserRole::Client));
        assert_eq!(required_role("/api/proposals"), None);
        assert_eq!(required_role("/apiadmin"), None);
        assert_eq!(required_role("/administrator"), None);
    }

    #[test]
    fn public_paths() {
        assert!(is_public("/"));
        assert!(is_public("/health"));
        assert!(is_public("/login"));
        assert!(is_public("/api/health/database"));
        assert!(is_public("/api/payments/webhook"));
        assert!(is_public("/api/payments/webhook/stripe"));
        assert!(!is_public("/api/payments/create"));
        assert!(!is_public("/api/payments/webhooks-admin"));
        assert!(!is_public("/client/dashboard"));
    }

    #[test]
    fn unauthenticated_callers_go_to_login() {
        assert_eq!(decide("/api/proposals", None), GateDecision::RedirectToLogin);
        assert_eq!(
            decide("/client/dashboard", Some(&caller(UserRole::Visitor))),
            GateDecision::RedirectToLogin
        );
        assert_eq!(decide("/api/health/database", None), GateDecision::Allow);
    }

    #[test]
    fn insufficient_role_goes_to_own_dashboard() {
        assert_eq!(
            decide("/api/admin/users", Some(&caller(UserRole::Provider))),
            GateDecision::RedirectToDashboard(UserRole::Provider)
        );
        assert_eq!(
            decide("/provider/dashboard", Some(&caller(UserRole::Client))),
            GateDecision::RedirectToDashboard(UserRole::Client)
        );
    }

    #[test]
    fn sufficient_role_is_allowed() {
        assert_eq!(decide("/provider/dashboard", Some(&caller(UserRole::Admin))), GateDecision::Allow);
        assert_eq!(decide("/client/dashboard", Some(&caller(UserRole::Provider))), GateDecision::Allow);
        assert_eq!(decide("/api/proposals", Some(&caller(UserRole::Client))), GateDecision::Allow);
    }
}
