pub mod notificationdtos;
pub mod paymentdtos;
pub mod servicedtos;
pub mod userdtos;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            ((total.max(0) as u64 + limit as u64 - 1) / limit as u64) as u32
        };

        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// `page`/`limit` query pair. Pages start at 1, `limit` defaults to 20.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<u32>,
}

impl RequestQueryDto {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::success("ok", vec![1, 2])).unwrap();
        assert_eq!(body, serde_json::json!({ "success": true, "message": "ok", "data": [1, 2] }));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(PaginatedResponse::new(vec![0u8; 0], 41, 1, 20).total_pages, 3);
        assert_eq!(PaginatedResponse::new(vec![0u8; 0], 40, 1, 20).total_pages, 2);
        assert_eq!(PaginatedResponse::new(vec![0u8; 0], 0, 1, 20).total_pages, 0);
    }

    #[test]
    fn limit_is_capped_at_fifty() {
        let query = RequestQueryDto { page: Some(1), limit: Some(51) };
        assert!(query.validate().is_err());

        let query = RequestQueryDto::default();
        assert!(query.validate().is_ok());
        assert_eq!((query.page(), query.limit()), (1, 20));
    }
}
