//! # Polling Ingestor
//!
//! The heartbeat of PollCast. Once per interval it fetches the upstream
//! document, asks the change detector whether it is new, and if so publishes
//! it to the cache and broadcasts it to every connected client.
//!
//! ## Key Design Principles:
//! - **Sole Writer**: The ingestor owns the `CacheWriter`. Nothing else can
//!   replace the cached snapshot.
//! - **Set, Then Broadcast**: The broadcast for a snapshot is issued only after
//!   `set` has returned, so no client sees a snapshot the cache does not hold.
//! - **Skip on Overlap**: Cycles run inline in the loop and the interval uses
//!   `MissedTickBehavior::Skip`. A tick that arrives while a cycle is still in
//!   flight is dropped rather than queued.
//! - **Never Fatal**: A failed or rejected cycle only logs. The next tick
//!   proceeds as usual; the cache keeps its last good snapshot.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::core::cache::CacheWriter;
use crate::core::detector::should_accept;
use crate::core::dispatcher::Dispatcher;
use crate::core::snapshot::Snapshot;
use crate::retrieve::fetcher::{FetchError, Fetcher};

/// Whether a poll cycle is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    /// Waiting for the next tick.
    Idle,
    /// One fetch-detect-update cycle is running.
    Polling,
}

/// # Poll Outcome
///
/// The result of a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The candidate had a new marker; it is now cached and was broadcast.
    Accepted(Arc<Snapshot>),
    /// The candidate carried the cached marker and was discarded.
    Unchanged,
    /// No candidate could be fetched.
    Failed(FetchError),
}

/// Point-in-time copy of the ingestor's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    /// Completed cycles.
    pub cycles: u64,
    /// Cycles that published a new snapshot.
    pub accepted: u64,
    /// Cycles whose candidate was rejected as unchanged.
    pub unchanged: u64,
    /// Cycles that ended in a `FetchError`.
    pub failed: u64,
}

/// Shared, lock-free counters and state flag for one ingestor.
#[derive(Debug, Default)]
pub struct PollCounters {
    polling: AtomicBool,
    cycles: AtomicU64,
    accepted: AtomicU64,
    unchanged: AtomicU64,
    failed: AtomicU64,
}

impl PollCounters {
    /// Current state of the owning ingestor.
    pub fn state(&self) -> PollState {
        if self.polling.load(Ordering::Acquire) {
            PollState::Polling
        } else {
            PollState::Idle
        }
    }

    /// Copies the counters.
    pub fn stats(&self) -> PollStats {
        PollStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &PollOutcome) {
        let counter = match outcome {
            PollOutcome::Accepted(_) => &self.accepted,
            PollOutcome::Unchanged => &self.unchanged,
            PollOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }
}

/// # Polling Ingestor
///
/// Drives one `Fetcher` on a fixed interval.
pub struct PollingIngestor<F: Fetcher> {
    /// The upstream source.
    fetcher: F,
    /// Exclusive write access to the snapshot cache.
    writer: CacheWriter,
    /// Receives every accepted snapshot for fan-out.
    dispatcher: Arc<Dispatcher>,
    /// Period between cycle starts.
    interval: Duration,
    /// State flag and outcome counters, shareable with observers.
    counters: Arc<PollCounters>,
}

impl<F: Fetcher> PollingIngestor<F> {
    /// Creates an ingestor. `dispatcher` should read from `writer`'s cache.
    pub fn new(fetcher: F, writer: CacheWriter, dispatcher: Arc<Dispatcher>, interval: Duration) -> Self {
        Self {
            fetcher,
            writer,
            dispatcher,
            interval,
            counters: Arc::new(PollCounters::default()),
        }
    }

    /// Handle to the live counters, for health reporting.
    pub fn counters(&self) -> Arc<PollCounters> {
        Arc::clone(&self.counters)
    }

    /// Current state of the loop.
    pub fn state(&self) -> PollState {
        self.counters.state()
    }

    /// # Main Execution Loop
    ///
    /// Ticks immediately, then once per interval, until `shutdown` fires or its
    /// sender is dropped.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!("Polling ingestor started, interval {:?}.", self.interval);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    log::info!("Polling ingestor received shutdown signal.");
                    break;
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }

    /// # Poll Once
    ///
    /// Runs exactly one fetch → detect → (set + broadcast) cycle.
    pub async fn poll_once(&self) -> PollOutcome {
        self.counters.polling.store(true, Ordering::Release);

        let outcome = match self.fetcher.fetch().await {
            Ok(candidate) => self.apply(candidate),
            Err(e) => {
                log::warn!("Upstream fetch failed: {}. Keeping cached snapshot.", e);
                PollOutcome::Failed(e)
            }
        };

        self.counters.record(&outcome);
        self.counters.polling.store(false, Ordering::Release);
        outcome
    }

    fn apply(&self, candidate: Snapshot) -> PollOutcome {
        let current = self.writer.get();
        if !should_accept(current.as_deref(), &candidate) {
            log::debug!("Upstream unchanged at version {}.", candidate.version());
            return PollOutcome::Unchanged;
        }

        let published = self.writer.set(candidate);
        let delivered = self.dispatcher.broadcast(&published);
        log::info!(
            "New data detected, version {} pushed to {} client(s).",
            published.version(),
            delivered
        );
        PollOutcome::Accepted(published)
    }
}
