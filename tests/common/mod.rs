//! Shared fixtures: in-memory stores wired into the service layer and a
//! scripted gateway standing in for the mobile-money provider.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use pesagate_core::adapters::memory::{
    InMemoryAccountStore, InMemoryDraftStore, InMemoryTransactionStore,
};
use pesagate_core::auth::{self, Principal};
use pesagate_core::config::Config;
use pesagate_core::daraja::{DarajaError, PaymentGateway, StkPushRequest, StkPushResponse};
use pesagate_core::ports::{AccountStore, DraftStore, TransactionStore};
use pesagate_core::services::payments::PaymentInitiator;
use pesagate_core::services::registration::RegistrationCoordinator;

pub const SESSION_SECRET: &str = "test-session-secret";
pub const CALLBACK_SECRET: &str = "test-callback-secret";

/// How the scripted gateway answers the next STK push.
#[derive(Debug, Clone)]
pub enum GatewayScript {
    Accept,
    Reject { code: String, description: String },
    Unreachable,
}

pub struct ScriptedGateway {
    script: std::sync::Mutex<GatewayScript>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(script: GatewayScript) -> Arc<Self> {
        Arc::new(Self {
            script: std::sync::Mutex::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(GatewayScript::Accept)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn stk_push(&self, _request: StkPushRequest) -> Result<StkPushResponse, DarajaError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let script = self.script.lock().unwrap().clone();
        match script {
            GatewayScript::Accept => Ok(StkPushResponse {
                response_code: "0".to_string(),
                merchant_request_id: format!("MR-{}", n),
                checkout_request_id: format!("ws_CO_{}", n),
                customer_message: "Success. Request accepted for processing".to_string(),
                response_description: "Success. Request accepted for processing".to_string(),
            }),
            GatewayScript::Reject { code, description } => Ok(StkPushResponse {
                response_code: code,
                merchant_request_id: format!("MR-{}", n),
                checkout_request_id: format!("ws_CO_{}", n),
                customer_message: description.clone(),
                response_description: description,
            }),
            GatewayScript::Unreachable => Err(DarajaError::InvalidResponse(
                "connection refused".to_string(),
            )),
        }
    }
}

/// Everything a service-level test needs, wired over in-memory stores.
pub struct Harness {
    pub transactions: Arc<InMemoryTransactionStore>,
    pub drafts: Arc<InMemoryDraftStore>,
    pub accounts: Arc<InMemoryAccountStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub payments: Arc<PaymentInitiator>,
    pub registration: Arc<RegistrationCoordinator>,
}

impl Harness {
    pub fn new(gateway: Arc<ScriptedGateway>) -> Self {
        let transactions = Arc::new(InMemoryTransactionStore::new());
        let drafts = Arc::new(InMemoryDraftStore::sharing_transactions(&transactions));
        let accounts = Arc::new(InMemoryAccountStore::new());

        let tx_store: Arc<dyn TransactionStore> = transactions.clone();
        let draft_store: Arc<dyn DraftStore> = drafts.clone();
        let account_store: Arc<dyn AccountStore> = accounts.clone();

        let payments = Arc::new(PaymentInitiator::new(
            tx_store.clone(),
            gateway.clone(),
            "254".to_string(),
        ));
        let registration = Arc::new(RegistrationCoordinator::new(
            payments.clone(),
            tx_store,
            draft_store,
            account_store,
            SESSION_SECRET.to_string(),
            BigDecimal::from(1),
            72,
        ));

        Self {
            transactions,
            drafts,
            accounts,
            gateway,
            payments,
            registration,
        }
    }
}

/// Full router over the harness, for request-level tests.
pub fn app(harness: &Harness) -> axum::Router {
    let transactions: Arc<dyn TransactionStore> = harness.transactions.clone();
    pesagate_core::create_app(pesagate_core::AppState {
        config: test_config(),
        pool: None,
        transactions,
        payments: harness.payments.clone(),
        registration: harness.registration.clone(),
    })
}

pub fn agent() -> Principal {
    Principal {
        user_id: Uuid::new_v4(),
    }
}

pub fn agent_token() -> (Principal, String) {
    let principal = agent();
    (principal, auth::issue_token(SESSION_SECRET, principal.user_id))
}

pub fn test_config() -> Config {
    Config {
        server_port: 0,
        database_url: "postgres://unused".to_string(),
        daraja_base_url: "http://gateway.invalid".to_string(),
        daraja_api_key: "unused".to_string(),
        callback_secret: CALLBACK_SECRET.to_string(),
        session_secret: SESSION_SECRET.to_string(),
        country_code: "254".to_string(),
        registration_fee: BigDecimal::from(1),
        draft_retention_hours: 72,
        sweep_interval_secs: 3600,
    }
}
