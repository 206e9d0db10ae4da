//! ProjectorsWorkerPool - drives collected events through the projectors
//!
//! ## Message Flow
//!
//! ```text
//! EventSender::submit → bounded mpsc → worker 1..N → registry lookup → projector 1 → projector 2 → ...
//!                                          ↑
//!                                          └─── CancellationToken
//! ```
//!
//! ## Guarantees
//!
//! - The channel is bounded: submitters wait when it is full (backpressure)
//! - Projectors of one event run sequentially, in registration order, on one worker
//! - No ordering between different events
//! - A failing or panicking projector is recorded and skipped; it never stops
//!   the other projectors of the event, its worker, or the pool
//! - On cancellation workers take no new events, finish the one in flight
//!   and exit; events still queued are dropped

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use super::event::DataCollectedEvent;
use super::registry::ProjectorRegistry;
use crate::config::PipelineConfig;

/// Why an event was not accepted into the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The pool is shutting down or gone
    ChannelClosed,

    /// The event was rejected before reaching the channel
    InvalidEvent(String),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::ChannelClosed => write!(f, "projection pipeline is not accepting events"),
            SubmitError::InvalidEvent(msg) => write!(f, "invalid event: {}", msg),
        }
    }
}

impl std::error::Error for SubmitError {}

/// A projector that did not complete for an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionFailure {
    pub projector: &'static str,
    pub reason: String,
}

/// Outcome of running one event through its projectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionReport {
    pub event_id: u64,
    pub discovery_type: String,

    /// Number of projectors invoked
    pub invoked: usize,

    pub failures: Vec<ProjectionFailure>,
}

impl ProjectionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.invoked - self.failures.len()
    }
}

/// Pool statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Events taken off the channel and projected
    pub events_processed: u64,

    /// Events without any registered projector
    pub unmatched_events: u64,

    pub projections_succeeded: u64,

    pub projections_failed: u64,
}

#[derive(Default)]
struct PoolCounters {
    events_processed: AtomicU64,
    unmatched_events: AtomicU64,
    projections_succeeded: AtomicU64,
    projections_failed: AtomicU64,
}

impl PoolCounters {
    fn record(&self, report: &ProjectionReport) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        if report.invoked == 0 {
            self.unmatched_events.fetch_add(1, Ordering::Relaxed);
        }
        self.projections_succeeded
            .fetch_add(report.succeeded() as u64, Ordering::Relaxed);
        self.projections_failed
            .fetch_add(report.failures.len() as u64, Ordering::Relaxed);
    }
}

/// Read access to the statistics of a pool, also after it stopped
#[derive(Clone)]
pub struct PoolStatsHandle(Arc<PoolCounters>);

impl PoolStatsHandle {
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            events_processed: self.0.events_processed.load(Ordering::Relaxed),
            unmatched_events: self.0.unmatched_events.load(Ordering::Relaxed),
            projections_succeeded: self.0.projections_succeeded.load(Ordering::Relaxed),
            projections_failed: self.0.projections_failed.load(Ordering::Relaxed),
        }
    }
}

/// Submission side of the pool's channel
///
/// Cheap to clone. Once every sender is dropped the channel closes and the
/// workers exit after draining it. Every sender observes the pool's
/// cancellation token and rejects events once it fires.
#[derive(Clone)]
pub struct EventSender {
    sender: mpsc::Sender<DataCollectedEvent>,
    cancel: CancellationToken,
}

impl EventSender {
    /// Put an event on the channel
    ///
    /// Returns as soon as there is room. When the channel is full this waits
    /// until a worker takes an event, or until cancellation.
    pub async fn submit(&self, event: DataCollectedEvent) -> Result<(), SubmitError> {
        if self.cancel.is_cancelled() {
            return Err(SubmitError::ChannelClosed);
        }

        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Err(SubmitError::ChannelClosed),

            result = self.sender.send(event) => result.map_err(|_| SubmitError::ChannelClosed),
        }
    }

    /// `true` once the pool is cancelled or gone
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.sender.is_closed()
    }
}

/// Fixed-size pool of projection workers sharing one inbound channel
///
/// Single use: [`run`](Self::run) consumes the pool. Cancelling `cancel`
/// stops the workers and closes every [`EventSender`] handed out.
pub struct ProjectorsWorkerPool {
    registry: Arc<ProjectorRegistry>,
    workers: usize,
    sender: mpsc::Sender<DataCollectedEvent>,
    receiver: mpsc::Receiver<DataCollectedEvent>,
    counters: Arc<PoolCounters>,
    cancel: CancellationToken,
}

impl ProjectorsWorkerPool {
    pub fn new(
        registry: Arc<ProjectorRegistry>,
        config: &PipelineConfig,
        cancel: CancellationToken,
    ) -> Self {
        let workers = config.workers.max(1);
        let capacity = config.channel_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);

        debug!("creating projection pool with {workers} workers, channel capacity {capacity}");

        Self {
            registry,
            workers,
            sender,
            receiver,
            counters: Arc::new(PoolCounters::default()),
            cancel,
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
            cancel: self.cancel.clone(),
        }
    }

    pub fn stats(&self) -> PoolStatsHandle {
        PoolStatsHandle(self.counters.clone())
    }

    /// Run the workers until cancellation or until every sender is dropped
    #[instrument(skip_all, fields(workers = self.workers))]
    pub async fn run(self) {
        let Self {
            registry,
            workers,
            sender,
            receiver,
            counters,
            cancel,
        } = self;

        // Only external senders keep the channel open
        drop(sender);

        info!("starting projection pool");

        let receiver = Arc::new(Mutex::new(receiver));
        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    receiver.clone(),
                    registry.clone(),
                    counters.clone(),
                    cancel.clone(),
                ))
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                error!("projection worker failed: {e}");
            }
        }

        info!("projection pool stopped");
    }
}

#[instrument(skip_all, fields(worker = worker_id))]
async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<DataCollectedEvent>>>,
    registry: Arc<ProjectorRegistry>,
    counters: Arc<PoolCounters>,
    cancel: CancellationToken,
) {
    debug!("worker started");

    loop {
        let next = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("cancellation requested");
                break;
            }

            event = async { receiver.lock().await.recv().await } => event,
        };

        let Some(event) = next else {
            debug!("event channel closed");
            break;
        };

        let report = project_event(&registry, &event).await;
        counters.record(&report);
    }

    debug!("worker stopped");
}

/// Run `event` through every projector registered for its type
///
/// Projectors run one after the other in registration order. Failures and
/// panics are collected in the report; the remaining projectors still run.
#[instrument(skip_all, fields(event_id = event.id, discovery_type = %event.discovery_type))]
pub async fn project_event(
    registry: &ProjectorRegistry,
    event: &DataCollectedEvent,
) -> ProjectionReport {
    let projectors = registry.lookup(&event.discovery_type);

    let mut report = ProjectionReport {
        event_id: event.id,
        discovery_type: event.discovery_type.clone(),
        invoked: projectors.len(),
        failures: Vec::new(),
    };

    if projectors.is_empty() {
        trace!("no projector registered, ignoring event");
        return report;
    }

    for projector in projectors {
        let outcome = AssertUnwindSafe(projector.project(event))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => trace!("{} projected event", projector.name()),
            Ok(Err(e)) => {
                warn!("{} failed to project event: {e}", projector.name());
                report.failures.push(ProjectionFailure {
                    projector: projector.name(),
                    reason: e.to_string(),
                });
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!("{} panicked while projecting event: {reason}", projector.name());
                report.failures.push(ProjectionFailure {
                    projector: projector.name(),
                    reason: format!("panicked: {reason}"),
                });
            }
        }
    }

    report
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
