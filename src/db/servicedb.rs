use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::BigDecimal, Error};
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::servicemodel::{Service, ServiceStatus},
};

pub(crate) const SERVICE_COLUMNS: &str = "id, client_id, provider_id, title, description, category, location, \
     budget, final_price, scheduled_date, status, created_at, updated_at";

pub struct NewService {
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub budget: Option<BigDecimal>,
    pub scheduled_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, serde::Serialize, sqlx::FromRow)]
pub struct ServiceCounts {
    pub pending: i64,
    pub accepted: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
}

#[async_trait]
pub trait ServicesExt {
    async fn create_service(&self, service: NewService) -> Result<Service, Error>;

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, Error>;

    async fn get_client_services(
        &self,
        client_id: Uuid,
        status: Option<ServiceStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Service>, Error>;

    async fn count_client_services(
        &self,
        client_id: Uuid,
        status: Option<ServiceStatus>,
    ) -> Result<i64, Error>;

    /// Open marketplace (pending, unassigned) plus services assigned to the provider.
    async fn get_provider_services(
        &self,
        provider_id: Uuid,
        status: Option<ServiceStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Service>, Error>;

    async fn count_provider_services(
        &self,
        provider_id: Uuid,
        status: Option<ServiceStatus>,
    ) -> Result<i64, Error>;

    async fn get_all_services(
        &self,
        status: Option<ServiceStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Service>, Error>;

    async fn count_services(&self, status: Option<ServiceStatus>) -> Result<i64, Error>;

    /// Moves a service only if it is still in `from`. `None` when another
    /// writer got there first.
    async fn update_service_status(
        &self,
        service_id: Uuid,
        from: ServiceStatus,
        to: ServiceStatus,
    ) -> Result<Option<Service>, Error>;

    async fn count_services_for_client(&self, client_id: Uuid) -> Result<ServiceCounts, Error>;

    async fn count_services_for_provider(&self, provider_id: Uuid) -> Result<ServiceCounts, Error>;

    async fn count_all_services(&self) -> Result<ServiceCounts, Error>;
}

fn page_offset(page: u32, limit: u32) -> i64 {
    (page.saturating_sub(1) as i64) * limit as i64
}

const CLIENT_FILTER: &str = "client_id = $1 AND ($2::service_status IS NULL OR status = $2)";

const PROVIDER_FILTER: &str = "(provider_id = $1 OR (provider_id IS NULL AND status = 'pending')) \
     AND ($2::service_status IS NULL OR status = $2)";

fn counts_query(filter: &str) -> String {
    format!(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE status = 'pending') AS pending,
            COUNT(*) FILTER (WHERE status = 'accepted') AS accepted,
            COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress,
            COUNT(*) FILTER (WHERE status = 'completed') AS completed,
            COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
        FROM services
        {}
        "#,
        filter
    )
}

#[async_trait]
impl ServicesExt for DBClient {
    async fn create_service(&self, service: NewService) -> Result<Service, Error> {
        let sql = format!(
            r#"
            INSERT INTO services
            (client_id, title, description, category, location, budget, scheduled_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SERVICE_COLUMNS
        );

        sqlx::query_as::<_, Service>(&sql)
            .bind(service.client_id)
            .bind(service.title)
            .bind(service.description)
            .bind(service.category)
            .bind(service.location)
            .bind(service.budget)
            .bind(service.scheduled_date)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, Error> {
        let sql = format!("SELECT {} FROM services WHERE id = $1", SERVICE_COLUMNS);

        sqlx::query_as::<_, Service>(&sql)
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_client_services(
        &self,
        client_id: Uuid,
        status: Option<ServiceStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Service>, Error> {
        let sql = format!(
            r#"
            SELECT {} FROM services
            WHERE {}
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            SERVICE_COLUMNS, CLIENT_FILTER
        );

        sqlx::query_as::<_, Service>(&sql)
            .bind(client_id)
            .bind(status)
            .bind(limit as i64)
            .bind(page_offset(page, limit))
            .fetch_all(&self.pool)
            .await
    }

    async fn count_client_services(
        &self,
        client_id: Uuid,
        status: Option<ServiceStatus>,
    ) -> Result<i64, Error> {
        let sql = format!("SELECT COUNT(*) FROM services WHERE {}", CLIENT_FILTER);

        sqlx::query_scalar::<_, i64>(&sql)
            .bind(client_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_provider_services(
        &self,
        provider_id: Uuid,
        status: Option<ServiceStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Service>, Error> {
        let sql = format!(
            r#"
            SELECT {} FROM services
            WHERE {}
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            SERVICE_COLUMNS, PROVIDER_FILTER
        );

        sqlx::query_as::<_, Service>(&sql)
            .bind(provider_id)
            .bind(status)
            .bind(limit as i64)
            .bind(page_offset(page, limit))
            .fetch_all(&self.pool)
            .await
    }

    async fn count_provider_services(
        &self,
        provider_id: Uuid,
        status: Option<ServiceStatus>,
    ) -> Result<i64, Error> {
        let sql = format!("SELECT COUNT(*) FROM services WHERE {}", PROVIDER_FILTER);

        sqlx::query_scalar::<_, i64>(&sql)
            .bind(provider_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_all_services(
        &self,
        status: Option<ServiceStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Service>, Error> {
        let sql = format!(
            r#"
            SELECT {} FROM services
            WHERE ($1::service_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            SERVICE_COLUMNS
        );

        sqlx::query_as::<_, Service>(&sql)
            .bind(status)
            .bind(limit as i64)
            .bind(page_offset(page, limit))
            .fetch_all(&self.pool)
            .await
    }

    async fn count_services(&self, status: Option<ServiceStatus>) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM services WHERE ($1::service_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_service_status(
        &self,
        service_id: Uuid,
        from: ServiceStatus,
        to: ServiceStatus,
    ) -> Result<Option<Service>, Error> {
        let sql = format!(
            r#"
            UPDATE services
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            SERVICE_COLUMNS
        );

        sqlx::query_as::<_, Service>(&sql)
            .bind(service_id)
            .bind(from)
            .bind(to)
            .fetch_optional(&self.pool)
            .await
    }

    async fn count_services_for_client(&self, client_id: Uuid) -> Result<ServiceCounts, Error> {
        sqlx::query_as::<_, ServiceCounts>(&counts_query("WHERE client_id = $1"))
            .bind(client_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn count_services_for_provider(&self, provider_id: Uuid) -> Result<ServiceCounts, Error> {
        sqlx::query_as::<_, ServiceCounts>(&counts_query("WHERE provider_id = $1"))
            .bind(provider_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn count_all_services(&self) -> Result<ServiceCounts, Error> {
        sqlx::query_as::<_, ServiceCounts>(&counts_query(""))
            .fetch_one(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    use crate::{
        db::{
            proposaldb::ProposalExt,
            testing::{bid, open_service, profile},
        },
        models::usermodel::UserRole,
    };

    #[sqlx::test(migrations = "./migrations")]
    async fn client_listing_is_paged_and_scoped(pool: PgPool) {
        let db = DBClient::new(pool);
        let client = profile(&db, UserRole::Client).await;
        let neighbour = profile(&db, UserRole::Client).await;

        for _ in 0..3 {
            open_service(&db, client).await;
        }
        open_service(&db, neighbour).await;

        assert_eq!(db.count_client_services(client, None).await.unwrap(), 3);
        assert_eq!(db.get_client_services(client, None, 1, 2).await.unwrap().len(), 2);

        let last = db.get_client_services(client, None, 2, 2).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].client_id, client);

        assert_eq!(
            db.count_client_services(client, Some(ServiceStatus::Completed)).await.unwrap(),
            0
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn provider_sees_open_and_own_work(pool: PgPool) {
        let db = DBClient::new(pool);
        let client = profile(&db, UserRole::Client).await;
        let provider = profile(&db, UserRole::Provider).await;
        let rival = profile(&db, UserRole::Provider).await;

        let open = open_service(&db, client).await;
        let mine = open_service(&db, client).await;
        let theirs = open_service(&db, client).await;

        let won = bid(&db, mine.id, provider, "80").await;
        db.accept_proposal(won.id, client).await.unwrap();
        let lost = bid(&db, theirs.id, rival, "70").await;
        db.accept_proposal(lost.id, client).await.unwrap();

        assert_eq!(db.count_provider_services(provider, None).await.unwrap(), 2);

        let listed: Vec<Uuid> = db
            .get_provider_services(provider, None, 1, 20)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert!(listed.contains(&open.id));
        assert!(listed.contains(&mine.id));
        assert!(!listed.contains(&theirs.id));

        assert_eq!(db.get_provider_services(provider, None, 2, 1).await.unwrap().len(), 1);
    }
}
