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
    dtos::{
        servicedtos::{CreateProposalDto, ProposalQueryDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddleware,
    utils::currency::decimal_from_f64,
    AppState,
};

pub fn proposals_handler() -> Router {
    Router::new()
        .route("/", get(list_proposals).post(create_proposal))
        .route("/:proposal_id/accept", patch(accept_proposal))
        .route("/:proposal_id/reject", patch(reject_proposal))
}

pub async fn create_proposal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateProposalDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let proposed_price = decimal_from_f64(body.proposed_price)
        .ok_or_else(|| HttpError::bad_request("Proposed price is not a valid amount"))?;

    let proposal = app_state
        .proposal_service
        .submit_proposal(
            &auth.user,
            body.service_id,
            proposed_price,
            body.description,
            body.estimated_duration,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Proposal submitted successfully", proposal)),
    ))
}

pub async fn list_proposals(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Query(query): Query<ProposalQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let proposals = app_state
        .proposal_service
        .list_proposals(&auth.user, query.service_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Proposals retrieved successfully",
        proposals,
    )))
}

pub async fn accept_proposal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(proposal_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .proposal_service
        .accept_proposal(auth.user.id, proposal_id)
        .await?;

    Ok(Json(ApiResponse::success("Proposal accepted", outcome)))
}

pub async fn reject_proposal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(proposal_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let proposal = app_state
        .proposal_service
        .reject_proposal(auth.user.id, proposal_id)
        .await?;

    Ok(Json(ApiResponse::success("Proposal rejected", proposal)))
}
