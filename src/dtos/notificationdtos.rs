use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::notificationmodel::Notification;

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct NotificationQueryDto {
    pub unread_only: Option<bool>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct NotificationListDto {
    pub notifications: Vec<Notification>,
    pub unread: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CalendarQueryDto {
    pub from: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_event_window"))]
pub struct CreateCalendarEventDto {
    pub service_id: Uuid,

    #[validate(length(min = 1, max = 120, message = "Title must be between 1 and 120 characters"))]
    pub title: String,

    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

fn validate_event_window(dto: &CreateCalendarEventDto) -> Result<(), ValidationError> {
    match dto.ends_at {
        Some(ends_at) if ends_at < dto.starts_at => {
            Err(ValidationError::new("ends_at must not be before starts_at"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn event_cannot_end_before_it_starts() {
        let starts_at = Utc::now();
        let dto = CreateCalendarEventDto {
            service_id: Uuid::new_v4(),
            title: "Painting visit".to_string(),
            starts_at,
            ends_at: Some(starts_at + Duration::hours(2)),
        };
        assert!(dto.validate().is_ok());

        let backwards = CreateCalendarEventDto {
            ends_at: Some(starts_at - Duration::hours(1)),
            ..dto
        };
        assert!(backwards.validate().is_err());
    }
}
