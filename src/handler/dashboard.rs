use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};
use serde_json::json;

use crate::{
    db::{
        notificationdb::NotificationExt,
        paymentdb::PaymentExt,
        proposaldb::ProposalExt,
        servicedb::ServicesExt,
        userdb::UserExt,
    },
    dtos::ApiResponse,
    error::HttpError,
    middleware::JWTAuthMiddleware,
    models::servicemodel::ProposalStatus,
    service::error::ServiceError,
    utils::currency::format_centavos,
    AppState,
};

const RECENT: u32 = 5;

/// Client, provider and employee dashboards. The admin one lives with the
/// other admin routes.
pub fn dashboard_handler() -> Router {
    Router::new()
        .route("/client/dashboard", get(client_dashboard))
        .route("/provider/dashboard", get(provider_dashboard))
        .route("/employee/dashboard", get(employee_dashboard))
}

pub async fn client_dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;
    let user_id = auth.user.id;

    let counts = db.count_services_for_client(user_id).await.map_err(ServiceError::from)?;
    let recent = db
        .get_client_services(user_id, None, 1, RECENT)
        .await
        .map_err(ServiceError::from)?;
    let spent = db.sum_paid_by_client(user_id).await.map_err(ServiceError::from)?;
    let unread = db.count_unread_notifications(user_id).await.map_err(ServiceError::from)?;

    Ok(Json(ApiResponse::success(
        "Client dashboard",
        json!({
            "services": counts,
            "recent_services": recent,
            "total_spent_cents": spent,
            "total_spent": format_centavos(spent),
            "unread_notifications": unread,
        }),
    )))
}

pub async fn provider_dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;
    let user_id = auth.user.id;

    let counts = db.count_services_for_provider(user_id).await.map_err(ServiceError::from)?;
    let open = db
        .count_provider_proposals(user_id, ProposalStatus::New)
        .await
        .map_err(ServiceError::from)?;
    let won = db
        .count_provider_proposals(user_id, ProposalStatus::Accepted)
        .await
        .map_err(ServiceError::from)?;
    let earned = db.sum_paid_for_provider(user_id).await.map_err(ServiceError::from)?;
    let unread = db.count_unread_notifications(user_id).await.map_err(ServiceError::from)?;

    Ok(Json(ApiResponse::success(
        "Provider dashboard",
        json!({
            "services": counts,
            "open_proposals": open,
            "accepted_proposals": won,
            "total_earned_cents": earned,
            "total_earned": format_centavos(earned),
            "unread_notifications": unread,
        }),
    )))
}

pub async fn employee_dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;

    let counts = db.count_all_services().await.map_err(ServiceError::from)?;
    let recent = db
        .get_all_services(None, 1, RECENT)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(ApiResponse::success(
        "Employee dashboard",
        json!({
            "services": counts,
            "recent_services": recent,
        }),
    )))
}

pub async fn admin_dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;

    let counts = db.count_all_services().await.map_err(ServiceError::from)?;
    let users: serde_json::Map<String, serde_json::Value> = db
        .count_profiles_by_role()
        .await
        .map_err(ServiceError::from)?
        .into_iter()
        .map(|(role, count)| (role.to_str().to_string(), json!(count)))
        .collect();
    let audit = db.list_audit_log(1, RECENT).await.map_err(ServiceError::from)?;

    Ok(Json(ApiResponse::success(
        "Admin dashboard",
        json!({
            "services": counts,
            "users_by_role": users,
            "recent_admin_actions": audit,
        }),
    )))
}
