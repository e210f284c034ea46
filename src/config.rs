use anyhow::Context;
use bigdecimal::BigDecimal;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

use crate::phone::DEFAULT_COUNTRY_CODE;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub daraja_base_url: String,
    pub daraja_api_key: String,
    /// Shared secret for verifying gateway callback signatures.
    pub callback_secret: String,
    /// Secret for signing session tokens.
    pub session_secret: String,
    pub country_code: String,
    /// Fixed nominal fee charged for member registration.
    pub registration_fee: BigDecimal,
    /// How long an unresolved registration draft is retained.
    pub draft_retention_hours: i64,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            daraja_base_url: env::var("DARAJA_BASE_URL").context("DARAJA_BASE_URL must be set")?,
            daraja_api_key: env::var("DARAJA_API_KEY").context("DARAJA_API_KEY must be set")?,
            callback_secret: env::var("CALLBACK_SECRET").context("CALLBACK_SECRET must be set")?,
            session_secret: env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?,
            country_code: env::var("COUNTRY_CODE")
                .unwrap_or_else(|_| DEFAULT_COUNTRY_CODE.to_string()),
            registration_fee: env::var("REGISTRATION_FEE")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("REGISTRATION_FEE must be a decimal: {}", e))?,
            draft_retention_hours: env::var("DRAFT_RETENTION_HOURS")
                .unwrap_or_else(|_| "72".to_string())
                .parse()?,
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()?,
        })
    }
}
