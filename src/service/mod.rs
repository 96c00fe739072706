pub mod access_control;
pub mod admin_service;
pub mod audit_service;
pub mod auth_provider;
pub mod error;
pub mod marketplace_service;
pub mod notification_service;
pub mod payment_provider;
pub mod payment_service;
pub mod proposal_service;
pub mod webhook;
