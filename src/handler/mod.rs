pub mod admin;
pub mod auth;
pub mod calendar;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod proposals;
pub mod services;
