use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, patch},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::notificationdb::NotificationExt,
    dtos::{
        notificationdtos::{NotificationListDto, NotificationQueryDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddleware,
    service::error::ServiceError,
    AppState,
};

pub fn notifications_handler() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:notification_id/read", patch(mark_read))
}

pub async fn list_notifications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Query(query): Query<NotificationQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let notifications = app_state
        .db_client
        .get_user_notifications(
            auth.user.id,
            query.unread_only.unwrap_or(false),
            query.limit.unwrap_or(50),
        )
        .await
        .map_err(ServiceError::from)?;

    let unread = app_state
        .db_client
        .count_unread_notifications(auth.user.id)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(ApiResponse::success(
        "Notifications retrieved successfully",
        NotificationListDto {
            notifications,
            unread,
        },
    )))
}

pub async fn mark_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    // scoped to the caller, so someone else's id reads as missing
    let notification = app_state
        .db_client
        .mark_notification_read(notification_id, auth.user.id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| HttpError::not_found("Notification not found"))?;

    Ok(Json(ApiResponse::success("Notification marked as read", notification)))
}
