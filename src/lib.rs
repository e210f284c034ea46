pub mod adapters;
pub mod auth;
pub mod cli;
pub mod config;
pub mod daraja;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod phone;
pub mod ports;
pub mod services;
pub mod validation;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::ports::TransactionStore;
use crate::services::payments::PaymentInitiator;
use crate::services::registration::RegistrationCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Present when running against Postgres; `None` with in-memory stores.
    pub pool: Option<sqlx::PgPool>,
    pub transactions: Arc<dyn TransactionStore>,
    pub payments: Arc<PaymentInitiator>,
    pub registration: Arc<RegistrationCoordinator>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/payments", post(handlers::payments::initiate_payment))
        .route("/payments/:id", get(handlers::payments::payment_status))
        .route("/register", post(handlers::registration::register))
        .route(
            "/register/:transaction_id/status",
            get(handlers::registration::registration_status),
        )
        .route("/callback", post(handlers::callback::callback))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
