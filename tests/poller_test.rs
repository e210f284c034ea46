use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pesagate_core::domain::TxStatus;
use pesagate_core::error::AppError;
use pesagate_core::services::{poll, PollConfig, PollEvent, StatusSource};

/// Replays a fixed sequence of fetch outcomes, then keeps answering
/// `Pending` once the script runs out. Counts every probe issued.
struct ScriptedSource {
    script: Mutex<VecDeque<Result<TxStatus, AppError>>>,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<TxStatus, AppError>>) -> (Self, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        (
            Self {
                script: Mutex::new(script.into()),
                fetches: fetches.clone(),
            },
            fetches,
        )
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    type Status = TxStatus;

    async fn fetch(&self) -> Result<TxStatus, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(Ok(TxStatus::Pending))
    }

    fn is_terminal(status: &TxStatus) -> bool {
        status.is_terminal()
    }
}

fn quick(max_attempts: u32) -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(10),
        max_attempts,
    }
}

#[tokio::test]
async fn budget_exhaustion_yields_timed_out() {
    // Three pending observations, then the budget runs out. The session
    // ends with an explicitly ambiguous timeout, not a failure verdict.
    let (source, fetches) = ScriptedSource::new(vec![
        Ok(TxStatus::Pending),
        Ok(TxStatus::Pending),
        Ok(TxStatus::Pending),
    ]);
    let (stream, _handle) = poll(source, quick(3));
    let events: Vec<_> = stream.collect().await;

    assert_eq!(
        events,
        vec![
            PollEvent::Status(TxStatus::Pending),
            PollEvent::Status(TxStatus::Pending),
            PollEvent::Status(TxStatus::Pending),
            PollEvent::TimedOut,
        ]
    );
    assert_eq!(fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn terminal_status_ends_the_session() {
    let (source, fetches) = ScriptedSource::new(vec![
        Ok(TxStatus::Pending),
        Ok(TxStatus::Pending),
        Ok(TxStatus::Completed),
    ]);
    let (stream, _handle) = poll(source, quick(10));
    let events: Vec<_> = stream.collect().await;

    assert_eq!(
        events,
        vec![
            PollEvent::Status(TxStatus::Pending),
            PollEvent::Status(TxStatus::Pending),
            PollEvent::Status(TxStatus::Completed),
        ]
    );
    // No probe after the terminal observation.
    assert_eq!(fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failed_probe_consumes_an_attempt_without_an_event() {
    let (source, fetches) = ScriptedSource::new(vec![
        Err(AppError::Database("connection reset".to_string())),
        Ok(TxStatus::Pending),
        Ok(TxStatus::Failed),
    ]);
    let (stream, _handle) = poll(source, quick(3));
    let events: Vec<_> = stream.collect().await;

    assert_eq!(
        events,
        vec![
            PollEvent::Status(TxStatus::Pending),
            PollEvent::Status(TxStatus::Failed),
        ]
    );
    assert_eq!(fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn all_probes_failing_still_terminates() {
    let (source, fetches) = ScriptedSource::new(vec![
        Err(AppError::Database("down".to_string())),
        Err(AppError::Database("down".to_string())),
    ]);
    let (stream, _handle) = poll(source, quick(2));
    let events: Vec<_> = stream.collect().await;

    assert_eq!(events, vec![PollEvent::TimedOut]);
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cancel_between_attempts_stops_before_the_next_probe() {
    let (source, fetches) = ScriptedSource::new(vec![Ok(TxStatus::Pending)]);
    let (stream, handle) = poll(source, quick(100));
    tokio::pin!(stream);

    assert_eq!(
        stream.next().await,
        Some(PollEvent::Status(TxStatus::Pending))
    );

    handle.cancel();
    assert!(handle.is_cancelled());

    // The session ends without issuing attempt two.
    assert_eq!(stream.next().await, None);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_before_first_probe_issues_nothing() {
    let (source, fetches) = ScriptedSource::new(vec![Ok(TxStatus::Completed)]);
    let (stream, handle) = poll(source, quick(5));
    handle.cancel();

    tokio::pin!(stream);
    assert_eq!(stream.next().await, None);
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
}

/// Every fetch parks until the test releases it, so cancellation can land
/// while a probe is verifiably in flight.
struct SlowSource {
    gate: Arc<tokio::sync::Notify>,
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl StatusSource for SlowSource {
    type Status = TxStatus;

    async fn fetch(&self) -> Result<TxStatus, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(TxStatus::Completed)
    }

    fn is_terminal(status: &TxStatus) -> bool {
        status.is_terminal()
    }
}

#[tokio::test]
async fn cancel_discards_an_in_flight_result() {
    let gate = Arc::new(tokio::sync::Notify::new());
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = SlowSource {
        gate: gate.clone(),
        fetches: fetches.clone(),
    };

    let (stream, handle) = poll(source, quick(5));
    let consumer = tokio::spawn(async move { stream.collect::<Vec<_>>().await });

    // Wait until the first probe is in flight, then cancel and let the
    // probe complete. Its terminal result must not be surfaced.
    while fetches.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    handle.cancel();
    gate.notify_one();

    let events = consumer.await.unwrap();
    assert!(events.is_empty());
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}
