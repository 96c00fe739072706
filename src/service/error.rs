use thiserror::Error;
use uuid::Uuid;
use axum::http::StatusCode;

use crate::{
    error::{ErrorMessage, HttpError},
    service::payment_provider::GatewayError,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service {0} not found")]
    ServiceNotFound(Uuid),

    #[error("Proposal {0} not found")]
    ProposalNotFound(Uuid),

    #[error("Payment {0} not found")]
    PaymentNotFound(Uuid),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Auth provider error: {0}")]
    AuthProvider(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ServiceNotFound(_)
            | ServiceError::ProposalNotFound(_)
            | ServiceError::PaymentNotFound(_)
            | ServiceError::UserNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Validation(_)
            | ServiceError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,

            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,

            ServiceError::Conflict(_) => StatusCode::CONFLICT,

            ServiceError::Gateway(_)
            | ServiceError::AuthProvider(_)
            | ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match error {
            ServiceError::Database(e) => {
                tracing::error!("database error: {}", e);
                HttpError::new(ErrorMessage::ServerError.to_string(), status)
            }
            other => {
                if status.is_server_error() {
                    tracing::error!("{}", other);
                }
                HttpError::new(other.to_string(), status)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_onto_http_statuses() {
        let id = Uuid::new_v4();
        let cases = vec![
            (ServiceError::ProposalNotFound(id), StatusCode::NOT_FOUND),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                ServiceError::InvalidTransition { from: "paid".into(), to: "pending".into() },
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::AuthProvider("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            let http: HttpError = error.into();
            assert_eq!(http.status, expected);
        }
    }

    #[test]
    fn database_errors_are_not_leaked() {
        let http: HttpError = ServiceError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(http.message, "Internal server error");
    }

    #[test]
    fn validation_message_passes_through() {
        let http: HttpError =
            ServiceError::Validation("Service already has an assigned provider".into()).into();
        assert_eq!(http.message, "Service already has an assigned provider");
    }
}
