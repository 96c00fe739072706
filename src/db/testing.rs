//! Fixtures for tests that run against a migrated database.
use std::str::FromStr;

use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        paymentdb::{NewPayment, PaymentExt},
        proposaldb::ProposalExt,
        servicedb::{NewService, ServicesExt},
        userdb::UserExt,
    },
    models::{
        paymentmodel::{Payment, PaymentMethod},
        servicemodel::{Proposal, Service},
        usermodel::UserRole,
    },
};

pub fn money(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

pub async fn profile(db: &DBClient, role: UserRole) -> Uuid {
    let id = Uuid::new_v4();
    db.ensure_profile(id, &format!("{}@servicehub.test", id), None, None, role)
        .await
        .unwrap();
    id
}

pub async fn open_service(db: &DBClient, client_id: Uuid) -> Service {
    db.create_service(NewService {
        client_id,
        title: "Paint the living room".to_string(),
        description: "Two walls, light grey, paint provided".to_string(),
        category: "painting".to_string(),
        location: None,
        budget: Some(money("200")),
        scheduled_date: None,
    })
    .await
    .unwrap()
}

pub async fn bid(db: &DBClient, service_id: Uuid, provider_id: Uuid, price: &str) -> Proposal {
    db.create_proposal(
        service_id,
        provider_id,
        money(price),
        "Can do it this week".to_string(),
        None,
    )
    .await
    .unwrap()
}

pub async fn pix_payment(db: &DBClient, service_id: Uuid, payer_id: Uuid, billing_id: &str) -> Payment {
    let method = PaymentMethod::Pix;
    db.create_payment(NewPayment {
        service_id,
        payer_id,
        amount_cents: 10_000,
        currency: "BRL".to_string(),
        method,
        gateway: method.gateway(),
        gateway_billing_id: billing_id.to_string(),
        client_secret: None,
        pix_br_code: Some("00020101021226".to_string()),
        pix_br_code_base64: None,
        expires_at: None,
    })
    .await
    .unwrap()
}
