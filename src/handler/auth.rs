use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, routing::post, Extension, Json, Router};

use crate::{
    db::userdb::UserExt,
    dtos::{userdtos::EnsureProfileResponseDto, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddleware,
    service::error::ServiceError,
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new().route("/ensure-profile", post(ensure_profile))
}

/// Creates the caller's profile from the session claims on first sign-in.
pub async fn ensure_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    if auth.user.email.is_empty() {
        return Err(HttpError::bad_request("Session does not carry an email"));
    }

    let (profile, created) = app_state
        .db_client
        .ensure_profile(
            auth.user.id,
            &auth.user.email,
            auth.metadata.full_name.clone(),
            auth.metadata.phone.clone(),
            auth.user.role,
        )
        .await
        .map_err(ServiceError::from)?;

    if created {
        tracing::info!("profile created for {} as {}", profile.id, profile.role.to_str());
    }

    let (status, message) = if created {
        (StatusCode::CREATED, "Profile created")
    } else {
        (StatusCode::OK, "Profile already exists")
    };

    Ok((
        status,
        Json(ApiResponse::success(
            message,
            EnsureProfileResponseDto { profile, created },
        )),
    ))
}
