use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// `responseCode` value meaning "prompt accepted, awaiting customer PIN".
pub const RESPONSE_CODE_ACCEPTED: &str = "0";

#[derive(Error, Debug)]
pub enum DarajaError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

/// STK push charge request sent to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    /// MSISDN the PIN prompt is delivered to.
    pub subscriber_id: String,
    /// Whole currency units; the gateway does not take fractions.
    pub amount: u64,
    /// Merchant-side reference echoed back in the callback.
    pub reference: String,
    pub description: String,
}

/// Synchronous gateway verdict on an STK push. `response_code == "0"` means
/// the prompt was delivered and the charge is pending customer PIN entry;
/// any other value is an outright rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushResponse {
    pub response_code: String,
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub customer_message: String,
    pub response_description: String,
}

impl StkPushResponse {
    pub fn is_accepted(&self) -> bool {
        self.response_code == RESPONSE_CODE_ACCEPTED
    }
}

/// Seam between the payment service and the mobile-money provider, so the
/// service layer can be exercised against a scripted gateway in tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initiates an STK push. `Ok` carries the gateway's verdict (accepted
    /// or rejected); `Err` means the gateway could not be reached at all.
    async fn stk_push(&self, request: StkPushRequest) -> Result<StkPushResponse, DarajaError>;
}

/// HTTP client for the mobile-money gateway's STK push API.
#[derive(Clone)]
pub struct DarajaClient {
    client: Client,
    base_url: String,
    api_key: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl DarajaClient {
    /// Creates a new DarajaClient with the specified base URL and API key.
    pub fn new(base_url: String, api_key: String) -> Self {
        Self::with_circuit_breaker(base_url, api_key, 3, 60)
    }

    /// Creates a new DarajaClient with custom circuit breaker configuration.
    pub fn with_circuit_breaker(
        base_url: String,
        api_key: String,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        DarajaClient {
            client,
            base_url,
            api_key,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker.
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }
}

#[async_trait]
impl PaymentGateway for DarajaClient {
    async fn stk_push(&self, request: StkPushRequest) -> Result<StkPushResponse, DarajaError> {
        let url = format!("{}/stkpush", self.base_url.trim_end_matches('/'));
        let client = self.client.clone();
        let api_key = self.api_key.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .bearer_auth(api_key)
                    .json(&request)
                    .send()
                    .await?
                    .error_for_status()?;

                let verdict = response.json::<StkPushResponse>().await?;
                Ok(verdict)
            })
            .await;

        match result {
            Ok(verdict) => Ok(verdict),
            Err(FailsafeError::Rejected) => Err(DarajaError::CircuitBreakerOpen(
                "gateway circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}
