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
    db::servicedb::NewService,
    dtos::{
        servicedtos::{CreateServiceDto, ServiceQueryDto, UpdateServiceStatusDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddleware,
    models::usermodel::UserRole,
    utils::currency::decimal_from_f64,
    AppState,
};

pub fn services_handler() -> Router {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route("/:service_id", get(get_service))
        .route("/:service_id/status", patch(update_service_status))
}

pub async fn create_service(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateServiceDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if auth.user.role != UserRole::Client {
        return Err(HttpError::forbidden("Only clients can post services"));
    }

    let budget = match body.budget {
        Some(value) => Some(
            decimal_from_f64(value).ok_or_else(|| HttpError::bad_request("Budget is not a valid amount"))?,
        ),
        None => None,
    };

    let service = app_state
        .marketplace_service
        .create_service(NewService {
            client_id: auth.user.id,
            title: body.title,
            description: body.description,
            category: body.category.trim().to_lowercase(),
            location: body.location,
            budget,
            scheduled_date: body.scheduled_date,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Service created successfully", service)),
    ))
}

pub async fn list_services(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Query(query): Query<ServiceQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let paging = query.paging();
    let services = app_state
        .marketplace_service
        .list_services(&auth.user, query.status, paging.page(), paging.limit())
        .await?;

    Ok(Json(ApiResponse::success(
        "Services retrieved successfully",
        services,
    )))
}

pub async fn get_service(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let service = app_state
        .marketplace_service
        .get_service(&auth.user, service_id)
        .await?;

    Ok(Json(ApiResponse::success("Service retrieved successfully", service)))
}

pub async fn update_service_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(service_id): Path<Uuid>,
    Json(body): Json<UpdateServiceStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let service = app_state
        .marketplace_service
        .update_status(auth.user.id, service_id, body.status)
        .await?;

    Ok(Json(ApiResponse::success("Service status updated", service)))
}
