use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "service_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl ServiceStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ServiceStatus::Pending => "pending",
            ServiceStatus::Accepted => "accepted",
            ServiceStatus::InProgress => "in_progress",
            ServiceStatus::Completed => "completed",
            ServiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceStatus::Completed | ServiceStatus::Cancelled)
    }

    /// Transitions reachable through a direct status update.
    /// `pending -> accepted` only happens by accepting a proposal.
    pub fn can_transition_to(&self, next: ServiceStatus) -> bool {
        matches!(
            (self, next),
            (ServiceStatus::Pending, ServiceStatus::Cancelled)
                | (ServiceStatus::Accepted, ServiceStatus::InProgress)
                | (ServiceStatus::Accepted, ServiceStatus::Cancelled)
                | (ServiceStatus::InProgress, ServiceStatus::Completed)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "proposal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    New,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ProposalStatus::New => "new",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub budget: Option<BigDecimal>,
    pub final_price: Option<BigDecimal>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub status: ServiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.provider_id == Some(user_id)
    }
}

/// A provider's bid on a service. Stored in `service_requests`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Proposal {
    pub id: Uuid,
    pub service_id: Uuid,
    pub provider_id: Uuid,
    pub proposed_price: BigDecimal,
    pub description: String,
    pub estimated_duration: Option<String>,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
