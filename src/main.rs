mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use crate::db::db::DBClient;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use service::{
    admin_service::AdminService,
    audit_service::AuditService,
    auth_provider::AuthProviderClient,
    marketplace_service::MarketplaceService,
    notification_service::NotificationService,
    payment_provider::PaymentProviderService,
    payment_service::PaymentService,
    proposal_service::ProposalService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub marketplace_service: Arc<MarketplaceService>,
    pub proposal_service: Arc<ProposalService>,
    pub payment_service: Arc<PaymentService>,
    pub admin_service: Arc<AdminService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);

        let payment_provider = Arc::new(PaymentProviderService::new(&config));
        let auth_provider = Arc::new(AuthProviderClient::new(&config));

        let notification_service = Arc::new(NotificationService::new(db_client_arc.clone()));
        let audit_service = Arc::new(AuditService::new(db_client_arc.clone()));

        let marketplace_service = Arc::new(MarketplaceService::new(
            db_client_arc.clone(),
            notification_service.clone(),
        ));

        let proposal_service = Arc::new(ProposalService::new(
            db_client_arc.clone(),
            notification_service.clone(),
        ));

        let payment_service = Arc::new(PaymentService::new(
            db_client_arc.clone(),
            payment_provider,
            notification_service,
        ));

        let admin_service = Arc::new(AdminService::new(
            db_client_arc.clone(),
            auth_provider,
            audit_service,
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            marketplace_service,
            proposal_service,
            payment_service,
            admin_service,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_max_level(LevelFilter::INFO).init();
            tracing::error!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let level = config
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::DEBUG);
    tracing_subscriber::fmt().with_max_level(level).init();

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("failed to run migrations: {}", err);
        std::process::exit(1);
    }

    let allowed_origins = match config.app_url.parse::<HeaderValue>() {
        Ok(origin) => vec![origin],
        Err(_) => {
            tracing::error!("APP_URL is not a valid origin: {}", config.app_url);
            std::process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH]);

    let app_state = Arc::new(AppState::new(DBClient::new(pool), config.clone()));

    let app = create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", err);
        std::process::exit(1);
    }
}
