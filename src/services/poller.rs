//! Client-driven status polling.
//!
//! A polling session is an explicit, cancellable task that owns its attempt
//! counter: an immediate probe, then one probe per interval, until a
//! terminal status is observed or the attempt budget runs out. Giving up is
//! reported as [`PollEvent::TimedOut`], which is not a failure verdict; the
//! payment may still resolve server-side after the poller stops.

use async_trait::async_trait;
use futures::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{RegistrationStatus, TxStatus};
use crate::error::AppError;
use crate::ports::TransactionStore;
use crate::services::registration::RegistrationCoordinator;

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// One observation from a polling session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent<T> {
    Status(T),
    /// Attempt budget exhausted without a terminal observation. Explicitly
    /// ambiguous: the charge may still land later.
    TimedOut,
}

/// A status surface the poller can probe repeatedly.
#[async_trait]
pub trait StatusSource: Send + Sync + 'static {
    type Status: Send + 'static;

    async fn fetch(&self) -> Result<Self::Status, AppError>;

    fn is_terminal(status: &Self::Status) -> bool;
}

/// Cancellation handle for a polling session. Cancelling takes effect
/// before the next probe is issued; an in-flight probe may finish but its
/// result is discarded.
#[derive(Clone)]
pub struct PollHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Starts a polling session over `source`. The stream issues at most
/// `max_attempts` probes and always terminates: on a terminal status, on
/// budget exhaustion (after emitting `TimedOut`), or silently on
/// cancellation.
pub fn poll<S: StatusSource>(
    source: S,
    config: PollConfig,
) -> (impl Stream<Item = PollEvent<S::Status>>, PollHandle) {
    let cancelled = Arc::new(AtomicBool::new(false));
    let notify = Arc::new(Notify::new());
    let handle = PollHandle {
        cancelled: cancelled.clone(),
        notify: notify.clone(),
    };

    let stream = async_stream::stream! {
        for attempt in 0..config.max_attempts {
            if attempt > 0 {
                tokio::select! {
                    _ = sleep(config.interval) => {}
                    _ = notify.notified() => {}
                }
            }
            // Checked before every probe, so cancellation between attempts
            // guarantees no further request goes out.
            if cancelled.load(Ordering::SeqCst) {
                return;
            }

            let observed = source.fetch().await;
            if cancelled.load(Ordering::SeqCst) {
                // Cancelled while the probe was in flight; discard.
                return;
            }

            match observed {
                Ok(status) => {
                    let terminal = S::is_terminal(&status);
                    yield PollEvent::Status(status);
                    if terminal {
                        return;
                    }
                }
                Err(err) => {
                    // A failed probe consumes an attempt but is not a
                    // verdict on the payment.
                    warn!(attempt, error = %err, "status probe failed");
                }
            }
        }

        debug!(attempts = config.max_attempts, "poll budget exhausted");
        yield PollEvent::TimedOut;
    };

    (stream, handle)
}

/// Probes the raw payment status of one transaction.
pub struct PaymentStatusSource {
    store: Arc<dyn TransactionStore>,
    transaction_id: Uuid,
}

impl PaymentStatusSource {
    pub fn new(store: Arc<dyn TransactionStore>, transaction_id: Uuid) -> Self {
        Self {
            store,
            transaction_id,
        }
    }
}

#[async_trait]
impl StatusSource for PaymentStatusSource {
    type Status = TxStatus;

    async fn fetch(&self) -> Result<TxStatus, AppError> {
        Ok(self.store.get(self.transaction_id).await?.status)
    }

    fn is_terminal(status: &TxStatus) -> bool {
        status.is_terminal()
    }
}

/// Probes the registration-gated status of one transaction.
pub struct RegistrationStatusSource {
    coordinator: Arc<RegistrationCoordinator>,
    transaction_id: Uuid,
}

impl RegistrationStatusSource {
    pub fn new(coordinator: Arc<RegistrationCoordinator>, transaction_id: Uuid) -> Self {
        Self {
            coordinator,
            transaction_id,
        }
    }
}

#[async_trait]
impl StatusSource for RegistrationStatusSource {
    type Status = RegistrationStatus;

    async fn fetch(&self) -> Result<RegistrationStatus, AppError> {
        self.coordinator.status(self.transaction_id).await
    }

    fn is_terminal(status: &RegistrationStatus) -> bool {
        status.is_terminal()
    }
}
