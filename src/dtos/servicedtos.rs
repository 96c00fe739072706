use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{dtos::RequestQueryDto, models::servicemodel::ServiceStatus};

//Service DTOs
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateServiceDto {
    #[validate(length(min = 3, max = 120, message = "Title must be between 3 and 120 characters"))]
    pub title: String,

    #[validate(length(min = 10, max = 2000, message = "Description must be between 10 and 2000 characters"))]
    pub description: String,

    #[validate(length(min = 1, max = 60, message = "Category is required"))]
    pub category: String,

    #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
    pub location: Option<String>,

    #[validate(range(min = 0.01, max = 9999999999.99, message = "Budget must be between 0.01 and 9999999999.99"))]
    pub budget: Option<f64>,

    pub scheduled_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct ServiceQueryDto {
    pub status: Option<ServiceStatus>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<u32>,
}

impl ServiceQueryDto {
    pub fn paging(&self) -> RequestQueryDto {
        RequestQueryDto {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateServiceStatusDto {
    pub status: ServiceStatus,
}

//Proposal DTOs
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProposalDto {
    pub service_id: Uuid,

    #[validate(range(min = 0.01, max = 9999999999.99, message = "Proposed price must be between 0.01 and 9999999999.99"))]
    pub proposed_price: f64,

    #[validate(length(min = 10, max = 2000, message = "Description must be between 10 and 2000 characters"))]
    pub description: String,

    #[validate(length(min = 1, max = 60, message = "Estimated duration must be at most 60 characters"))]
    pub estimated_duration: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProposalQueryDto {
    pub service_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_price_must_be_positive() {
        let dto = CreateProposalDto {
            service_id: Uuid::new_v4(),
            proposed_price: 100.0,
            description: "Can start on Monday morning".to_string(),
            estimated_duration: Some("2 days".to_string()),
        };
        assert!(dto.validate().is_ok());

        let free = CreateProposalDto {
            proposed_price: 0.0,
            ..dto
        };
        assert!(free.validate().is_err());
    }

    #[test]
    fn prices_fit_the_money_columns() {
        let dto: CreateProposalDto = serde_json::from_value(serde_json::json!({
            "service_id": Uuid::new_v4(),
            "proposed_price": 1e12,
            "description": "Whole building renovation"
        }))
        .unwrap();
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("proposed_price"));

        let largest = CreateProposalDto {
            proposed_price: 9_999_999_999.99,
            ..dto
        };
        assert!(largest.validate().is_ok());

        let service: CreateServiceDto = serde_json::from_value(serde_json::json!({
            "title": "Renovation",
            "description": "Whole building renovation",
            "category": "construction",
            "budget": 1e12
        }))
        .unwrap();
        assert!(service.validate().unwrap_err().field_errors().contains_key("budget"));
    }

    #[test]
    fn service_needs_title_and_description() {
        let dto: CreateServiceDto = serde_json::from_value(serde_json::json!({
            "title": "Fix",
            "description": "short",
            "category": "repairs"
        }))
        .unwrap();

        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("description"));
    }

    #[test]
    fn service_query_defaults_paging() {
        let query: ServiceQueryDto = serde_json::from_value(serde_json::json!({ "limit": 5 })).unwrap();
        let paging = query.paging();
        assert_eq!((paging.page(), paging.limit()), (1, 5));

        let too_many = ServiceQueryDto { limit: Some(100), ..Default::default() };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn status_parses_snake_case() {
        let dto: UpdateServiceStatusDto =
            serde_json::from_str(r#"{"status":"in_progress"}"#).unwrap();
        assert_eq!(dto.status, ServiceStatus::InProgress);
    }
}
