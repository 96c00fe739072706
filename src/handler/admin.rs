use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::{
        userdtos::{CreateUserDto, UpdateUserRoleDto, UserListQueryDto},
        ApiResponse, PaginatedResponse, RequestQueryDto,
    },
    error::HttpError,
    handler::dashboard::admin_dashboard,
    middleware::JWTAuthMiddleware,
    service::error::ServiceError,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:user_id", patch(update_user_role).delete(delete_user))
        .route("/audit-log", get(audit_log))
        .route("/dashboard", get(admin_dashboard))
}

pub async fn list_users(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<UserListQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let paging = query.paging();
    let (page, limit) = (paging.page(), paging.limit());

    let users = app_state
        .db_client
        .list_profiles(page, limit, query.role)
        .await
        .map_err(ServiceError::from)?;

    let total = app_state
        .db_client
        .count_profiles(query.role)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(ApiResponse::success(
        "Users retrieved successfully",
        PaginatedResponse::new(users, total, page, limit),
    )))
}

pub async fn create_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let profile = app_state
        .admin_service
        .create_user(
            auth.user.id,
            &body.email,
            &body.password,
            body.full_name,
            body.phone,
            body.role,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User created successfully", profile)),
    ))
}

pub async fn update_user_role(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateUserRoleDto>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = app_state
        .admin_service
        .update_role(auth.user.id, user_id, body.role)
        .await?;

    Ok(Json(ApiResponse::success("User role updated", profile)))
}

pub async fn delete_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = app_state
        .admin_service
        .delete_user(auth.user.id, user_id)
        .await?;

    Ok(Json(ApiResponse::success("User deleted", profile)))
}

pub async fn audit_log(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (page, limit) = (query.page(), query.limit());

    let entries = app_state
        .db_client
        .list_audit_log(page, limit)
        .await
        .map_err(ServiceError::from)?;

    let total = app_state
        .db_client
        .count_audit_log()
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(ApiResponse::success(
        "Audit log retrieved",
        PaginatedResponse::new(entries, total, page, limit),
    )))
}
