//! In-process delivery queue with delayed retry.
//!
//! Producers enqueue freely from any task; one logical drain runs at a
//! time, guarded by an atomic flag so a second trigger is a no-op. A failed
//! send is pushed back with a `not_before` timestamp instead of blocking
//! the drain loop in a sleep; the earliest-ready item is taken first. After
//! `max_retries` retries the item is dropped and reported as exhausted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::providers::{EmailProvider, OutboundMessage, ProviderError};

/// Completion token shared by all queue items belonging to one report
/// record. The last item to finish, delivered or exhausted, yields the
/// batch result so the record's delivery status can be finalized once.
#[derive(Debug, Clone)]
pub struct ReportBatchToken {
    record_id: i64,
    remaining: Arc<AtomicUsize>,
    delivered: Arc<Mutex<Vec<String>>>,
    failures: Arc<AtomicUsize>,
}

/// Outcome of a finished report batch.
#[derive(Debug)]
pub struct ReportBatchResult {
    pub record_id: i64,
    pub delivered: Vec<String>,
    pub failures: usize,
}

impl ReportBatchToken {
    pub fn new(record_id: i64, total: usize) -> Self {
        Self {
            record_id,
            remaining: Arc::new(AtomicUsize::new(total)),
            delivered: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn record_id(&self) -> i64 {
        self.record_id
    }

    /// Register one finished message. Returns the batch result when this
    /// was the last outstanding one.
    pub fn complete_one(&self, email: &str, success: bool) -> Option<ReportBatchResult> {
        if success {
            self.delivered
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(email.to_string());
        } else {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            Some(ReportBatchResult {
                record_id: self.record_id,
                delivered: self
                    .delivered
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone(),
                failures: self.failures.load(Ordering::SeqCst),
            })
        } else {
            None
        }
    }
}

/// What a queued message is delivering. Routes the outcome back to the
/// owning record.
#[derive(Debug, Clone)]
pub enum DeliveryKind {
    Campaign {
        campaign_id: i64,
        recipient_id: i64,
        log_id: i64,
    },
    Report {
        log_id: i64,
        batch: ReportBatchToken,
    },
}

/// Gate decision before a send is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendClearance {
    Proceed,
    /// Owner no longer wants the message sent (paused/cancelled campaign);
    /// the item is dropped without an attempt.
    Skip,
}

/// Receives queue outcomes. The production implementation writes delivery
/// log rows and record statuses; tests substitute an in-memory recorder.
#[async_trait::async_trait]
pub trait DeliveryOutcomeHandler: Send + Sync {
    async fn clearance(&self, kind: &DeliveryKind) -> SendClearance;

    async fn delivered(
        &self,
        kind: &DeliveryKind,
        message: &OutboundMessage,
        provider_message_id: Option<&str>,
        elapsed_ms: i64,
    );

    /// A retryable failure; the item goes back on the queue.
    async fn retrying(&self, kind: &DeliveryKind, attempts: u32, error: &ProviderError);

    /// Retries exhausted or error not retryable; the item is dropped.
    async fn exhausted(&self, kind: &DeliveryKind, message: &OutboundMessage, error: &ProviderError);

    async fn skipped(&self, kind: &DeliveryKind, message: &OutboundMessage);
}

struct QueuedDelivery {
    kind: DeliveryKind,
    message: OutboundMessage,
    attempts: u32,
    not_before: Instant,
}

/// Counts for one drain run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// False when another drain was already running and this call no-opped.
    pub ran: bool,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Queue status snapshot.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub struct QueueStatus {
    pub pending: usize,
    /// Send attempts made by items currently in the queue.
    pub attempts: u64,
    pub draining: bool,
}

pub struct DeliveryQueue {
    items: Mutex<VecDeque<QueuedDelivery>>,
    draining: AtomicBool,
    max_retries: u32,
    retry_delay: Duration,
}

impl DeliveryQueue {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
            max_retries,
            retry_delay,
        }
    }

    /// Add a message. Safe from any task at any time, including mid-drain.
    pub fn enqueue(&self, kind: DeliveryKind, message: OutboundMessage) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.push_back(QueuedDelivery {
            kind,
            message,
            attempts: 0,
            not_before: Instant::now(),
        });
        gauge!("delivery_queue_depth").set(items.len() as f64);
    }

    pub fn status(&self) -> QueueStatus {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        QueueStatus {
            pending: items.len(),
            attempts: items.iter().map(|i| u64::from(i.attempts)).sum(),
            draining: self.draining.load(Ordering::SeqCst),
        }
    }

    /// Process items until the queue is empty. Returns immediately with
    /// `ran: false` when a drain is already in progress.
    pub async fn drain(
        &self,
        provider: &dyn EmailProvider,
        handler: &dyn DeliveryOutcomeHandler,
    ) -> DrainReport {
        if self.draining.swap(true, Ordering::SeqCst) {
            debug!("Delivery queue drain already running");
            return DrainReport::default();
        }
        let report = self.drain_inner(provider, handler).await;
        self.draining.store(false, Ordering::SeqCst);
        report
    }

    async fn drain_inner(
        &self,
        provider: &dyn EmailProvider,
        handler: &dyn DeliveryOutcomeHandler,
    ) -> DrainReport {
        let mut report = DrainReport {
            ran: true,
            ..DrainReport::default()
        };

        loop {
            let next = self.take_ready();
            let mut item = match next {
                Poll::Empty => break,
                Poll::Ready(item) => item,
                Poll::NotBefore(at) => {
                    tokio::time::sleep_until(at).await;
                    continue;
                }
            };

            if handler.clearance(&item.kind).await == SendClearance::Skip {
                handler.skipped(&item.kind, &item.message).await;
                report.skipped += 1;
                continue;
            }

            let started = Instant::now();
            item.attempts += 1;
            match provider.send(&item.message).await {
                Ok(outcome) => {
                    let elapsed_ms = started.elapsed().as_millis() as i64;
                    counter!("emails_sent_total", "provider" => provider.name()).increment(1);
                    handler
                        .delivered(
                            &item.kind,
                            &item.message,
                            outcome.provider_message_id.as_deref(),
                            elapsed_ms,
                        )
                        .await;
                    report.sent += 1;
                }
                Err(e) if e.is_retryable() && item.attempts <= self.max_retries => {
                    warn!(
                        to = %item.message.to,
                        attempts = item.attempts,
                        error = %e,
                        "Send failed, requeueing"
                    );
                    handler.retrying(&item.kind, item.attempts, &e).await;
                    item.not_before = Instant::now() + self.retry_delay;
                    self.items
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push_back(item);
                }
                Err(e) => {
                    counter!("emails_failed_total", "provider" => provider.name()).increment(1);
                    warn!(
                        to = %item.message.to,
                        attempts = item.attempts,
                        error = %e,
                        "Send failed permanently, dropping"
                    );
                    handler.exhausted(&item.kind, &item.message, &e).await;
                    report.failed += 1;
                }
            }
        }

        gauge!("delivery_queue_depth").set(0.0);
        if report.sent + report.failed + report.skipped > 0 {
            info!(
                sent = report.sent,
                failed = report.failed,
                skipped = report.skipped,
                "Delivery queue drained"
            );
        }
        report
    }

    /// Pop the earliest-ready item, or report how long until one is ready.
    fn take_ready(&self) -> Poll {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.is_empty() {
            return Poll::Empty;
        }
        let now = Instant::now();
        let earliest = items
            .iter()
            .enumerate()
            .min_by_key(|(_, item)| item.not_before)
            .map(|(idx, item)| (idx, item.not_before));
        match earliest {
            Some((idx, at)) if at <= now => match items.remove(idx) {
                Some(item) => {
                    gauge!("delivery_queue_depth").set(items.len() as f64);
                    Poll::Ready(item)
                }
                None => Poll::Empty,
            },
            Some((_, at)) => Poll::NotBefore(at),
            None => Poll::Empty,
        }
    }
}

enum Poll {
    Empty,
    Ready(QueuedDelivery),
    NotBefore(Instant),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderHealth, SendOutcome};
    use std::sync::atomic::AtomicUsize;

    fn message(to: &str) -> OutboundMessage {
        OutboundMessage {
            to: to.to_string(),
            to_name: None,
            subject: "subject".to_string(),
            body: "body".to_string(),
        }
    }

    fn campaign_kind(recipient_id: i64) -> DeliveryKind {
        DeliveryKind::Campaign {
            campaign_id: 1,
            recipient_id,
            log_id: recipient_id,
        }
    }

    /// Provider that fails the first `failures` sends, then succeeds.
    struct FlakyProvider {
        calls: AtomicUsize,
        failures: usize,
    }

    impl FlakyProvider {
        fn failing_first(failures: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl EmailProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn send(&self, _message: &OutboundMessage) -> Result<SendOutcome, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ProviderError::Transport("connection reset".into()))
            } else {
                Ok(SendOutcome::default())
            }
        }

        fn health(&self) -> ProviderHealth {
            ProviderHealth {
                name: "flaky".into(),
                configured: true,
                verified: None,
            }
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Delivered(String),
        Retrying(u32),
        Exhausted(String),
        Skipped { to: String, log_id: i64 },
    }

    #[derive(Default)]
    struct RecordingHandler {
        events: Mutex<Vec<Event>>,
        skip_all: bool,
    }

    impl RecordingHandler {
        fn skipping() -> Self {
            Self {
                skip_all: true,
                ..Self::default()
            }
        }

        fn events(&self) -> Vec<Event> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }

        fn push(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[async_trait::async_trait]
    impl DeliveryOutcomeHandler for RecordingHandler {
        async fn clearance(&self, _kind: &DeliveryKind) -> SendClearance {
            if self.skip_all {
                SendClearance::Skip
            } else {
                SendClearance::Proceed
            }
        }

        async fn delivered(
            &self,
            _kind: &DeliveryKind,
            message: &OutboundMessage,
            _provider_message_id: Option<&str>,
            _elapsed_ms: i64,
        ) {
            self.push(Event::Delivered(message.to.clone()));
        }

        async fn retrying(&self, _kind: &DeliveryKind, attempts: u32, _error: &ProviderError) {
            self.push(Event::Retrying(attempts));
        }

        async fn exhausted(
            &self,
            _kind: &DeliveryKind,
            message: &OutboundMessage,
            _error: &ProviderError,
        ) {
            self.push(Event::Exhausted(message.to.clone()));
        }

        async fn skipped(&self, kind: &DeliveryKind, message: &OutboundMessage) {
            let log_id = match kind {
                DeliveryKind::Campaign { log_id, .. } | DeliveryKind::Report { log_id, .. } => {
                    *log_id
                }
            };
            self.push(Event::Skipped {
                to: message.to.clone(),
                log_id,
            });
        }
    }

    #[tokio::test]
    async fn test_drain_empties_queue_and_reports_each_send() {
        let queue = DeliveryQueue::new(3, Duration::from_millis(5));
        let provider = FlakyProvider::failing_first(0);
        let handler = RecordingHandler::default();

        for i in 0..5 {
            queue.enqueue(campaign_kind(i), message(&format!("user{i}@example.com")));
        }
        assert_eq!(queue.status().pending, 5);

        let report = queue.drain(&provider, &handler).await;
        assert!(report.ran);
        assert_eq!(report.sent, 5);
        assert_eq!(report.failed, 0);
        assert_eq!(queue.status().pending, 0);
        assert_eq!(handler.events().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_item_attempted_max_retries_plus_one_times() {
        let queue = DeliveryQueue::new(3, Duration::from_secs(5));
        let provider = FlakyProvider::failing_first(usize::MAX);
        let handler = RecordingHandler::default();

        queue.enqueue(campaign_kind(1), message("doomed@example.com"));
        let report = queue.drain(&provider, &handler).await;

        assert_eq!(provider.calls(), 4);
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(
            handler.events(),
            vec![
                Event::Retrying(1),
                Event::Retrying(2),
                Event::Retrying(3),
                Event::Exhausted("doomed@example.com".into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers_on_retry() {
        let queue = DeliveryQueue::new(3, Duration::from_secs(5));
        let provider = FlakyProvider::failing_first(2);
        let handler = RecordingHandler::default();

        queue.enqueue(campaign_kind(1), message("slow@example.com"));
        let report = queue.drain(&provider, &handler).await;

        assert_eq!(provider.calls(), 3);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_non_retryable_error_drops_immediately() {
        struct BadAddressProvider;

        #[async_trait::async_trait]
        impl EmailProvider for BadAddressProvider {
            fn name(&self) -> &'static str {
                "bad"
            }
            async fn send(
                &self,
                message: &OutboundMessage,
            ) -> Result<SendOutcome, ProviderError> {
                Err(ProviderError::InvalidAddress(message.to.clone()))
            }
            fn health(&self) -> ProviderHealth {
                ProviderHealth {
                    name: "bad".into(),
                    configured: true,
                    verified: None,
                }
            }
        }

        let queue = DeliveryQueue::new(3, Duration::from_millis(5));
        let handler = RecordingHandler::default();
        queue.enqueue(campaign_kind(1), message("not-an-address"));

        let report = queue.drain(&BadAddressProvider, &handler).await;
        assert_eq!(report.failed, 1);
        assert_eq!(
            handler.events(),
            vec![Event::Exhausted("not-an-address".into())]
        );
    }

    #[tokio::test]
    async fn test_skip_clearance_drops_without_send() {
        let queue = DeliveryQueue::new(3, Duration::from_millis(5));
        let provider = FlakyProvider::failing_first(0);
        let handler = RecordingHandler::skipping();

        queue.enqueue(campaign_kind(1), message("paused@example.com"));
        let report = queue.drain(&provider, &handler).await;

        assert_eq!(provider.calls(), 0);
        assert_eq!(report.skipped, 1);
        // The handler gets the item's log id so it can close out the
        // pending log row for the skipped attempt.
        assert_eq!(
            handler.events(),
            vec![Event::Skipped {
                to: "paused@example.com".into(),
                log_id: 1,
            }]
        );
    }

    #[tokio::test]
    async fn test_concurrent_drain_is_noop() {
        struct SlowProvider;

        #[async_trait::async_trait]
        impl EmailProvider for SlowProvider {
            fn name(&self) -> &'static str {
                "slow"
            }
            async fn send(
                &self,
                _message: &OutboundMessage,
            ) -> Result<SendOutcome, ProviderError> {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(SendOutcome::default())
            }
            fn health(&self) -> ProviderHealth {
                ProviderHealth {
                    name: "slow".into(),
                    configured: true,
                    verified: None,
                }
            }
        }

        let queue = Arc::new(DeliveryQueue::new(3, Duration::from_millis(5)));
        queue.enqueue(campaign_kind(1), message("a@example.com"));

        let background = Arc::clone(&queue);
        let first = tokio::spawn(async move {
            background.drain(&SlowProvider, &RecordingHandler::default()).await
        });
        // Let the first drain take the guard.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = queue.drain(&SlowProvider, &RecordingHandler::default()).await;
        assert!(!second.ran);

        let first = first.await.unwrap();
        assert!(first.ran);
        assert_eq!(first.sent, 1);
    }

    #[tokio::test]
    async fn test_enqueue_during_drain_is_processed() {
        let queue = Arc::new(DeliveryQueue::new(3, Duration::from_millis(5)));
        let handler = RecordingHandler::default();

        struct EnqueueOnSend {
            queue: Arc<DeliveryQueue>,
            extra_added: AtomicBool,
        }

        #[async_trait::async_trait]
        impl EmailProvider for EnqueueOnSend {
            fn name(&self) -> &'static str {
                "reentrant"
            }
            async fn send(
                &self,
                _message: &OutboundMessage,
            ) -> Result<SendOutcome, ProviderError> {
                if !self.extra_added.swap(true, Ordering::SeqCst) {
                    self.queue.enqueue(
                        DeliveryKind::Campaign {
                            campaign_id: 1,
                            recipient_id: 99,
                            log_id: 99,
                        },
                        OutboundMessage {
                            to: "late@example.com".into(),
                            to_name: None,
                            subject: "s".into(),
                            body: "b".into(),
                        },
                    );
                }
                Ok(SendOutcome::default())
            }
            fn health(&self) -> ProviderHealth {
                ProviderHealth {
                    name: "reentrant".into(),
                    configured: true,
                    verified: None,
                }
            }
        }

        queue.enqueue(campaign_kind(1), message("early@example.com"));
        let provider = EnqueueOnSend {
            queue: Arc::clone(&queue),
            extra_added: AtomicBool::new(false),
        };

        let report = queue.drain(&provider, &handler).await;
        assert_eq!(report.sent, 2);
        assert_eq!(queue.status().pending, 0);
    }

    #[test]
    fn test_report_batch_token_yields_result_once() {
        let token = ReportBatchToken::new(7, 3);
        assert!(token.complete_one("a@example.com", true).is_none());
        assert!(token.complete_one("b@example.com", false).is_none());
        let result = token.complete_one("c@example.com", true).unwrap();
        assert_eq!(result.record_id, 7);
        assert_eq!(result.delivered, vec!["a@example.com", "c@example.com"]);
        assert_eq!(result.failures, 1);
    }

    #[test]
    fn test_status_counts_attempts() {
        let queue = DeliveryQueue::new(3, Duration::from_millis(5));
        queue.enqueue(campaign_kind(1), message("a@example.com"));
        let status = queue.status();
        assert_eq!(status.pending, 1);
        assert_eq!(status.attempts, 0);
        assert!(!status.draining);
    }
}
