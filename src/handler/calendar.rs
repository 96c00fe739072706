use std::sync::Arc;

use axum::{
    extract::Query, http::StatusCode, response::IntoResponse, routing::get, Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::{notificationdb::NotificationExt, servicedb::ServicesExt},
    dtos::{
        notificationdtos::{CalendarQueryDto, CreateCalendarEventDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddleware,
    service::error::ServiceError,
    AppState,
};

pub fn calendar_handler() -> Router {
    Router::new().route("/", get(list_events).post(create_event))
}

pub async fn list_events(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Query(query): Query<CalendarQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let events = app_state
        .db_client
        .get_user_calendar_events(auth.user.id, query.from)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(ApiResponse::success("Calendar events retrieved", events)))
}

pub async fn create_event(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateCalendarEventDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let service = app_state
        .db_client
        .get_service(body.service_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::ServiceNotFound(body.service_id))?;

    if !service.is_participant(auth.user.id) {
        return Err(HttpError::forbidden(
            "Only the service client or provider can schedule it",
        ));
    }

    let event = app_state
        .db_client
        .create_calendar_event(
            auth.user.id,
            Some(service.id),
            &body.title,
            body.starts_at,
            body.ends_at,
        )
        .await
        .map_err(ServiceError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Calendar event created", event)),
    ))
}
