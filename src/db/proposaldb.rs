use async_trait::async_trait;
use sqlx::{types::BigDecimal, Error};
use uuid::Uuid;

use crate::{
    db::{db::DBClient, servicedb::SERVICE_COLUMNS},
    models::servicemodel::{Proposal, ProposalStatus, Service},
    service::{
        error::ServiceError,
        proposal_service::{plan_acceptance, AcceptanceOutcome},
    },
};

const PROPOSAL_COLUMNS: &str = "id, service_id, provider_id, proposed_price, description, \
     estimated_duration, status, created_at, updated_at";

#[async_trait]
pub trait ProposalExt {
    async fn create_proposal(
        &self,
        service_id: Uuid,
        provider_id: Uuid,
        proposed_price: BigDecimal,
        description: String,
        estimated_duration: Option<String>,
    ) -> Result<Proposal, Error>;

    async fn get_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, Error>;

    async fn get_service_proposals(&self, service_id: Uuid) -> Result<Vec<Proposal>, Error>;

    async fn get_provider_proposals(
        &self,
        provider_id: Uuid,
        service_id: Option<Uuid>,
    ) -> Result<Vec<Proposal>, Error>;

    async fn has_open_proposal(&self, service_id: Uuid, provider_id: Uuid) -> Result<bool, Error>;

    async fn count_provider_proposals(&self, provider_id: Uuid, status: ProposalStatus) -> Result<i64, Error>;

    /// Accepts one proposal and rejects its still-new siblings in a single
    /// transaction. The service row is locked and only claimed while it has
    /// no provider.
    async fn accept_proposal(
        &self,
        proposal_id: Uuid,
        caller_id: Uuid,
    ) -> Result<AcceptanceOutcome, ServiceError>;

    /// `new -> rejected` for a single proposal. `None` if it was no longer new.
    async fn reject_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, Error>;
}

#[async_trait]
impl ProposalExt for DBClient {
    async fn create_proposal(
        &self,
        service_id: Uuid,
        provider_id: Uuid,
        proposed_price: BigDecimal,
        description: String,
        estimated_duration: Option<String>,
    ) -> Result<Proposal, Error> {
        let sql = format!(
            r#"
            INSERT INTO service_requests
            (service_id, provider_id, proposed_price, description, estimated_duration)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PROPOSAL_COLUMNS
        );

        sqlx::query_as::<_, Proposal>(&sql)
            .bind(service_id)
            .bind(provider_id)
            .bind(proposed_price)
            .bind(description)
            .bind(estimated_duration)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, Error> {
        let sql = format!("SELECT {} FROM service_requests WHERE id = $1", PROPOSAL_COLUMNS);

        sqlx::query_as::<_, Proposal>(&sql)
            .bind(proposal_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_service_proposals(&self, service_id: Uuid) -> Result<Vec<Proposal>, Error> {
        let sql = format!(
            r#"
            SELECT {} FROM service_requests
            WHERE service_id = $1
            ORDER BY created_at DESC
            "#,
            PROPOSAL_COLUMNS
        );

        sqlx::query_as::<_, Proposal>(&sql)
            .bind(service_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_provider_proposals(
        &self,
        provider_id: Uuid,
        service_id: Option<Uuid>,
    ) -> Result<Vec<Proposal>, Error> {
        let sql = format!(
            r#"
            SELECT {} FROM service_requests
            WHERE provider_id = $1 AND ($2::uuid IS NULL OR service_id = $2)
            ORDER BY created_at DESC
            "#,
            PROPOSAL_COLUMNS
        );

        sqlx::query_as::<_, Proposal>(&sql)
            .bind(provider_id)
            .bind(service_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn has_open_proposal(&self, service_id: Uuid, provider_id: Uuid) -> Result<bool, Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM service_requests
                WHERE service_id = $1 AND provider_id = $2 AND status = 'new'
            )
            "#,
        )
        .bind(service_id)
        .bind(provider_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_provider_proposals(&self, provider_id: Uuid, status: ProposalStatus) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM service_requests WHERE provider_id = $1 AND status = $2",
        )
        .bind(provider_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn accept_proposal(
        &self,
        proposal_id: Uuid,
        caller_id: Uuid,
    ) -> Result<AcceptanceOutcome, ServiceError> {
        let mut tx = self.pool.begin().await?;

        // 1. Lock the service that owns the proposal
        let locked = sqlx::query_as::<_, Service>(
            r#"
            SELECT s.id, s.client_id, s.provider_id, s.title, s.description, s.category,
                   s.location, s.budget, s.final_price, s.scheduled_date, s.status,
                   s.created_at, s.updated_at
            FROM services s
            JOIN service_requests p ON p.service_id = s.id
            WHERE p.id = $1
            FOR UPDATE OF s
            "#,
        )
        .bind(proposal_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::ProposalNotFound(proposal_id))?;

        // 2. Lock every proposal of that service
        let proposals_sql = format!(
            r#"
            SELECT {} FROM service_requests
            WHERE service_id = $1
            ORDER BY created_at
            FOR UPDATE
            "#,
            PROPOSAL_COLUMNS
        );
        let proposals = sqlx::query_as::<_, Proposal>(&proposals_sql)
            .bind(locked.id)
            .fetch_all(&mut *tx)
            .await?;

        let plan = plan_acceptance(caller_id, &locked, &proposals, proposal_id)?;

        // 3. Winning proposal
        let accept_sql = format!(
            r#"
            UPDATE service_requests
            SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND status = 'new'
            RETURNING {}
            "#,
            PROPOSAL_COLUMNS
        );
        let proposal = sqlx::query_as::<_, Proposal>(&accept_sql)
            .bind(plan.proposal_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Proposal is no longer open".to_string()))?;

        // 4. Claim the service; zero rows means someone else already did
        let claim_sql = format!(
            r#"
            UPDATE services
            SET provider_id = $2, status = 'accepted', final_price = $3, updated_at = NOW()
            WHERE id = $1 AND provider_id IS NULL AND status = 'pending'
            RETURNING {}
            "#,
            SERVICE_COLUMNS
        );
        let service = sqlx::query_as::<_, Service>(&claim_sql)
            .bind(plan.service_id)
            .bind(plan.provider_id)
            .bind(&plan.final_price)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                ServiceError::Conflict("Service was assigned to another provider".to_string())
            })?;

        // 5. Siblings that were still open
        let rejected: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            UPDATE service_requests
            SET status = 'rejected', updated_at = NOW()
            WHERE id = ANY($1) AND status = 'new'
            RETURNING id, provider_id
            "#,
        )
        .bind(&plan.reject_ids[..])
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "proposal {} accepted for service {}; {} sibling(s) rejected",
            proposal.id,
            service.id,
            rejected.len()
        );

        let (rejected_proposal_ids, rejected_provider_ids) = rejected.into_iter().unzip();

        Ok(AcceptanceOutcome {
            service,
            proposal,
            rejected_proposal_ids,
            rejected_provider_ids,
        })
    }

    async fn reject_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, Error> {
        let sql = format!(
            r#"
            UPDATE service_requests
            SET status = 'rejected', updated_at = NOW()
            WHERE id = $1 AND status = 'new'
            RETURNING {}
            "#,
            PROPOSAL_COLUMNS
        );

        sqlx::query_as::<_, Proposal>(&sql)
            .bind(proposal_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use sqlx::PgPool;

    use crate::{
        db::{
            servicedb::ServicesExt,
            testing::{bid, money, open_service, profile},
        },
        models::{servicemodel::ServiceStatus, usermodel::UserRole},
    };

    async fn proposal_status(db: &DBClient, id: Uuid) -> ProposalStatus {
        db.get_proposal(id).await.unwrap().unwrap().status
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn accepting_the_cheaper_bid_claims_the_service(pool: PgPool) {
        let db = DBClient::new(pool);
        let client = profile(&db, UserRole::Client).await;
        let first = profile(&db, UserRole::Provider).await;
        let second = profile(&db, UserRole::Provider).await;

        let s1 = open_service(&db, client).await;
        let p1 = bid(&db, s1.id, first, "100").await;
        let p2 = bid(&db, s1.id, second, "150").await;

        let outcome = db.accept_proposal(p1.id, client).await.unwrap();

        assert_eq!(outcome.rejected_proposal_ids, vec![p2.id]);
        assert_eq!(outcome.rejected_provider_ids, vec![second]);

        let stored = db.get_service(s1.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ServiceStatus::Accepted);
        assert_eq!(stored.provider_id, Some(first));
        assert_eq!(stored.final_price, Some(money("100")));

        assert_eq!(proposal_status(&db, p1.id).await, ProposalStatus::Accepted);
        assert_eq!(proposal_status(&db, p2.id).await, ProposalStatus::Rejected);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn already_rejected_siblings_keep_their_row(pool: PgPool) {
        let db = DBClient::new(pool);
        let client = profile(&db, UserRole::Client).await;
        let winner = profile(&db, UserRole::Provider).await;
        let dropped = profile(&db, UserRole::Provider).await;

        let service = open_service(&db, client).await;
        let chosen = bid(&db, service.id, winner, "120").await;
        let earlier = bid(&db, service.id, dropped, "90").await;
        let before = db.reject_proposal(earlier.id).await.unwrap().unwrap();

        let outcome = db.accept_proposal(chosen.id, client).await.unwrap();
        assert!(outcome.rejected_proposal_ids.is_empty());

        let after = db.get_proposal(earlier.id).await.unwrap().unwrap();
        assert_eq!(after.status, ProposalStatus::Rejected);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn assigned_service_refuses_a_second_accept(pool: PgPool) {
        let db = DBClient::new(pool);
        let client = profile(&db, UserRole::Client).await;
        let first = profile(&db, UserRole::Provider).await;
        let second = profile(&db, UserRole::Provider).await;

        let service = open_service(&db, client).await;
        let p1 = bid(&db, service.id, first, "100").await;
        let p2 = bid(&db, service.id, second, "150").await;

        db.accept_proposal(p1.id, client).await.unwrap();
        let err = db.accept_proposal(p2.id, client).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let stored = db.get_service(service.id).await.unwrap().unwrap();
        assert_eq!(stored.provider_id, Some(first));
        assert_eq!(stored.final_price, Some(money("100")));
        assert_eq!(proposal_status(&db, p2.id).await, ProposalStatus::Rejected);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn stranger_cannot_accept_and_nothing_moves(pool: PgPool) {
        let db = DBClient::new(pool);
        let client = profile(&db, UserRole::Client).await;
        let other_client = profile(&db, UserRole::Client).await;
        let provider = profile(&db, UserRole::Provider).await;

        let service = open_service(&db, client).await;
        let p1 = bid(&db, service.id, provider, "100").await;

        let err = db.accept_proposal(p1.id, other_client).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let stored = db.get_service(service.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ServiceStatus::Pending);
        assert_eq!(stored.provider_id, None);
        assert_eq!(proposal_status(&db, p1.id).await, ProposalStatus::New);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn racing_accepts_have_a_single_winner(pool: PgPool) {
        let db = DBClient::new(pool);
        let client = profile(&db, UserRole::Client).await;
        let first = profile(&db, UserRole::Provider).await;
        let second = profile(&db, UserRole::Provider).await;

        let service = open_service(&db, client).await;
        let p1 = bid(&db, service.id, first, "100").await;
        let p2 = bid(&db, service.id, second, "150").await;

        let (a, b) = tokio::join!(
            db.accept_proposal(p1.id, client),
            db.accept_proposal(p2.id, client)
        );

        let (winner, loser) = match (a, b) {
            (Ok(w), Err(l)) | (Err(l), Ok(w)) => (w, l),
            (a, b) => panic!("expected exactly one winner, got {:?} / {:?}", a.is_ok(), b.is_ok()),
        };
        assert!(matches!(
            loser.status_code(),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT
        ));

        let accepted: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM service_requests WHERE service_id = $1 AND status = 'accepted'",
        )
        .bind(service.id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!(accepted, 1);

        let stored = db.get_service(service.id).await.unwrap().unwrap();
        assert_eq!(stored.provider_id, Some(winner.proposal.provider_id));
        assert_eq!(stored.final_price, Some(winner.proposal.proposed_price));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn second_open_bid_from_the_same_provider_is_refused(pool: PgPool) {
        let db = DBClient::new(pool);
        let client = profile(&db, UserRole::Client).await;
        let provider = profile(&db, UserRole::Provider).await;
        let service = open_service(&db, client).await;

        bid(&db, service.id, provider, "100").await;
        let err = db
            .create_proposal(service.id, provider, money("90"), "Lower offer".to_string(), None)
            .await
            .unwrap_err();

        match err {
            Error::Database(db_err) => assert!(db_err.is_unique_violation()),
            other => panic!("expected a unique violation, got {}", other),
        }
    }
}
