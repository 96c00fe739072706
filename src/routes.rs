use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    error::HttpError,
    handler::{
        admin::admin_handler, auth::auth_handler, calendar::calendar_handler,
        dashboard::dashboard_handler, health::{health_handler, liveness},
        notifications::notifications_handler, payments::payments_handler,
        proposals::proposals_handler, services::services_handler,
    },
    middleware::access_gate,
    AppState,
};

async fn not_found() -> HttpError {
    HttpError::not_found("Route not found")
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/admin", admin_handler())
        .nest("/auth", auth_handler())
        .nest("/health", health_handler())
        .nest("/payments", payments_handler())
        .nest("/proposals", proposals_handler())
        .nest("/services", services_handler())
        .nest("/notifications", notifications_handler())
        .nest("/calendar-events", calendar_handler())
        .merge(dashboard_handler());

    // The gate wraps everything, fallback included, so page paths are
    // redirected even though this server does not render them.
    Router::new()
        .route("/health", get(liveness))
        .nest("/api", api_route)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(Extension(app_state))
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(access_gate)),
        )
}
