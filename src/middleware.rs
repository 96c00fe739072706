use std::sync::Arc;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    service::access_control::{decide, is_api_path, resolve_role, Caller, GateDecision},
    utils::token::{self, UserMetadata},
    AppState,
};

const SESSION_COOKIES: [&str; 2] = ["sb-access-token", "token"];

#[derive(Debug, Clone)]
pub struct JWTAuthMiddleware {
    pub user: Caller,
    pub metadata: UserMetadata,
}

fn session_token(cookie_jar: &CookieJar, req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
        .or_else(|| {
            SESSION_COOKIES
                .iter()
                .find_map(|name| cookie_jar.get(name))
                .map(|cookie| cookie.value().to_string())
        })
}

/// Login URL that brings the user back to `path`. Leading slashes collapse
/// to one so the target always stays on this origin.
pub fn login_redirect(path: &str) -> String {
    let target = format!("/{}", path.trim_start_matches(&['/', '\\'][..]));
    format!("/login?redirect={}", urlencoding::encode(&target))
}

/// Resolves the caller from the session token. A bad or expired token is the
/// same as no session.
pub fn authenticate(app_state: &AppState, token: &str) -> Option<JWTAuthMiddleware> {
    let claims = match token::decode_session(
        token,
        app_state.env.auth_jwt_secret.as_bytes(),
        &app_state.env.auth_jwt_audience,
    ) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("rejected session token: {}", e);
            return None;
        }
    };

    let id = Uuid::parse_str(&claims.sub).ok()?;
    let role = resolve_role(
        &app_state.env.access,
        claims.email.as_deref(),
        claims.user_metadata.user_type.as_deref(),
    );

    Some(JWTAuthMiddleware {
        user: Caller {
            id,
            email: claims.email.unwrap_or_default(),
            role,
        },
        metadata: claims.user_metadata,
    })
}

/// Route-level access gate. API paths get JSON 401/403, page paths get
/// redirects to the login page or the caller's own dashboard.
pub async fn access_gate(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let token = session_token(&cookie_jar, &req);
    let session = token
        .as_deref()
        .and_then(|token| authenticate(&app_state, token));

    match decide(&path, session.as_ref().map(|s| &s.user)) {
        GateDecision::Allow => {
            if let Some(session) = session {
                req.extensions_mut().insert(session);
            }
            next.run(req).await
        }
        GateDecision::RedirectToLogin if is_api_path(&path) => {
            let message = if token.is_some() {
                ErrorMessage::InvalidToken
            } else {
                ErrorMessage::TokenNotProvided
            };
            HttpError::unauthorized(message.to_string()).into_response()
        }
        GateDecision::RedirectToLogin => {
            Redirect::temporary(&login_redirect(&path)).into_response()
        }
        GateDecision::RedirectToDashboard(role) if is_api_path(&path) => {
            tracing::warn!("{} denied {} on {}", role.to_str(), req.method(), path);
            HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()).into_response()
        }
        GateDecision::RedirectToDashboard(role) => {
            Redirect::temporary(role.dashboard_path()).into_response()
        }
    }
}
