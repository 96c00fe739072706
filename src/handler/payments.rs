use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    dtos::{paymentdtos::CreatePaymentDto, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddleware,
    models::paymentmodel::GatewayKind,
    service::webhook::{
        parse_abacatepay_event, parse_stripe_event, verify_abacatepay_signature,
        verify_stripe_signature, ABACATEPAY_SIGNATURE_HEADERS, STRIPE_SIGNATURE_HEADER,
    },
    AppState,
};

pub fn payments_handler() -> Router {
    Router::new()
        .route("/create", post(create_payment))
        .route("/status/:payment_id", get(payment_status))
        .route("/cancel/:payment_id", post(cancel_payment))
        .route("/webhook", post(abacatepay_webhook))
        .route("/webhook/stripe", post(stripe_webhook))
}

pub async fn create_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreatePaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .payment_service
        .create_payment(auth.user.id, body.service_id, body.method)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Payment created successfully", payment)),
    ))
}

pub async fn payment_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .payment_service
        .get_status(&auth.user, payment_id)
        .await?;

    Ok(Json(ApiResponse::success("Payment status retrieved", payment)))
}

pub async fn cancel_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .payment_service
        .cancel_payment(auth.user.id, payment_id)
        .await?;

    Ok(Json(ApiResponse::success("Payment cancelled", payment)))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

// AbacatePay webhook (PIX)
pub async fn abacatepay_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    let signature = ABACATEPAY_SIGNATURE_HEADERS
        .iter()
        .find_map(|name| header_value(&headers, name));

    if let Err(e) = verify_abacatepay_signature(
        &body,
        signature,
        &app_state.env.abacatepay_webhook_secret,
    ) {
        tracing::warn!("AbacatePay webhook rejected: {}", e);
        return Err(e.into());
    }

    let event = parse_abacatepay_event(&body)?;
    let outcome = app_state
        .payment_service
        .handle_webhook(GatewayKind::Abacatepay, event)
        .await?;

    Ok(Json(ApiResponse::success("Webhook processed", outcome)))
}

// Stripe webhook (card)
pub async fn stripe_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    if let Err(e) = verify_stripe_signature(
        &body,
        header_value(&headers, STRIPE_SIGNATURE_HEADER),
        &app_state.env.stripe_webhook_secret,
        Utc::now().timestamp(),
    ) {
        tracing::warn!("Stripe webhook rejected: {}", e);
        return Err(e.into());
    }

    let event = parse_stripe_event(&body)?;
    let outcome = app_state
        .payment_service
        .handle_webhook(GatewayKind::Stripe, event)
        .await?;

    Ok(Json(ApiResponse::success("Webhook processed", outcome)))
}
