use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::notificationmodel::{CalendarEvent, Notification},
};

#[async_trait]
pub trait NotificationExt {
    async fn create_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        title: &str,
        message: &str,
        service_id: Option<Uuid>,
    ) -> Result<Notification, Error>;

    async fn get_user_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<Notification>, Error>;

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>, Error>;

    async fn count_unread_notifications(&self, user_id: Uuid) -> Result<i64, Error>;

    async fn create_calendar_event(
        &self,
        user_id: Uuid,
        service_id: Option<Uuid>,
        title: &str,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<CalendarEvent, Error>;

    async fn get_user_calendar_events(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<CalendarEvent>, Error>;
}

#[async_trait]
impl NotificationExt for DBClient {
    async fn create_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        title: &str,
        message: &str,
        service_id: Option<Uuid>,
    ) -> Result<Notification, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, kind, title, message, service_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, kind, title, message, service_id, read, created_at
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .bind(service_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<Notification>, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, kind, title, message, service_id, read, created_at
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, kind, title, message, service_id, read, created_at
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_calendar_event(
        &self,
        user_id: Uuid,
        service_id: Option<Uuid>,
        title: &str,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<CalendarEvent, Error> {
        sqlx::query_as::<_, CalendarEvent>(
            r#"
            INSERT INTO calendar_events (user_id, service_id, title, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, service_id, title, starts_at, ends_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(service_id)
        .bind(title)
        .bind(starts_at)
        .bind(ends_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_calendar_events(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<CalendarEvent>, Error> {
        sqlx::query_as::<_, CalendarEvent>(
            r#"
            SELECT id, user_id, service_id, title, starts_at, ends_at, created_at
            FROM calendar_events
            WHERE user_id = $1 AND ($2::timestamptz IS NULL OR starts_at >= $2)
            ORDER BY starts_at
            "#,
        )
        .bind(user_id)
        .bind(from)
        .fetch_all(&self.pool)
        .await
    }
}
