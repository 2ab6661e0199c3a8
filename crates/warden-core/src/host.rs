//! The simulation host: owns the entity store and drains the dispatch
//! queue once per tick on its own thread.
//!
//! The host is the only code that ever holds `&mut` access to the store.
//! Everything else reaches it through the [`DispatchQueue`] (writes, and
//! reads by default) or through the [`StoreSnapshot`] the host publishes
//! after every tick (reads, when enabled).
//!
//! Control follows the same pattern as a long-running tick loop: a shared
//! [`HostControl`] carries atomic stop and speed flags that any thread may
//! flip without locking.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;
use warden_world::EntityStore;

use crate::config::{GatewayConfig, HostConfig};
use crate::dispatch::{DispatchQueue, DrainReport};
use crate::gateway::ToolGateway;

/// Reason the host loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// [`HostControl::request_stop`] was called.
    StopRequested,
}

/// Result of a host run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRunSummary {
    /// Why the loop ended.
    pub end_reason: HostEndReason,
    /// Ticks executed.
    pub total_ticks: u64,
    /// Dispatch tasks executed across all ticks.
    pub tasks_run: u64,
    /// Dispatch tasks that panicked.
    pub tasks_failed: u64,
    /// Dispatch tasks abandoned when the queue closed.
    pub tasks_abandoned: u64,
}

/// Shared control flags for a running host.
#[derive(Debug)]
pub struct HostControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,
    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,
    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,
    /// Wall-clock time the control was created.
    started_at: DateTime<Utc>,
}

impl HostControl {
    /// Create control state from configuration.
    pub fn new(config: &HostConfig) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(config.tick_interval_ms),
            max_ticks: config.max_ticks,
            started_at: Utc::now(),
        }
    }

    /// Request a clean stop after the current tick.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Change the tick interval. Takes effect after the current sleep.
    pub fn set_tick_interval_ms(&self, ms: u64) {
        self.tick_interval_ms.store(ms, Ordering::Release);
    }

    /// Configured tick limit (0 = unlimited).
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Whether `tick` reached the configured limit.
    pub const fn tick_limit_reached(&self, tick: u64) -> bool {
        self.max_ticks > 0 && tick >= self.max_ticks
    }

    /// Wall-clock seconds since the control was created.
    pub fn elapsed_seconds(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }
}

/// Read-only copy of the store, republished after every tick.
///
/// Readers clone the inner [`Arc`] and release the lock before doing any
/// work, so a slow read never delays publication.
#[derive(Debug)]
pub struct StoreSnapshot<W> {
    latest: RwLock<Option<Arc<W>>>,
    tick: AtomicU64,
}

impl<W> Default for StoreSnapshot<W> {
    fn default() -> Self {
        Self {
            latest: RwLock::new(None),
            tick: AtomicU64::new(0),
        }
    }
}

impl<W> StoreSnapshot<W> {
    /// Replace the published copy.
    pub fn publish(&self, store: W, tick: u64) {
        let fresh = Arc::new(store);
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(fresh);
        self.tick.store(tick, Ordering::Release);
    }

    /// The most recently published copy, if any tick has completed.
    pub fn latest(&self) -> Option<Arc<W>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Tick at which the current copy was taken.
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }
}

/// Owns the store and the dispatch queue that feeds it.
#[derive(Debug)]
pub struct SimulationHost<W> {
    store: W,
    queue: Arc<DispatchQueue<W>>,
    snapshot: Option<Arc<StoreSnapshot<W>>>,
    tick: u64,
}

impl<W: EntityStore + Clone + 'static> SimulationHost<W> {
    /// Take ownership of `store` and create its queue. A snapshot is
    /// published immediately when snapshot reads are enabled.
    pub fn new(store: W, gateway: &GatewayConfig) -> Self {
        let snapshot = gateway.snapshot_reads.then(|| {
            let snapshot = Arc::new(StoreSnapshot::default());
            snapshot.publish(store.clone(), 0);
            snapshot
        });
        Self {
            store,
            queue: Arc::new(DispatchQueue::new()),
            snapshot,
            tick: 0,
        }
    }

    /// A gateway bound to this host's queue (and snapshot, if enabled).
    pub fn gateway(&self) -> ToolGateway<W> {
        ToolGateway::new(Arc::clone(&self.queue), self.snapshot.clone())
    }

    /// Ticks completed so far.
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Tasks waiting for the next tick.
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Shared access to the store, for inspection between ticks.
    pub const fn store(&self) -> &W {
        &self.store
    }

    /// Give the store back and close the queue. Tasks still pending are
    /// abandoned, and gateways that outlive the host get `Abandoned`
    /// errors instead of waiting.
    pub fn into_store(self) -> W {
        self.queue.close();
        self.store
    }

    /// Run one tick: drain the queue against the store, then publish the
    /// snapshot.
    pub fn tick(&mut self) -> DrainReport {
        self.tick = self.tick.saturating_add(1);
        let report = self.queue.drain_all(&mut self.store);
        if let Some(snapshot) = &self.snapshot {
            snapshot.publish(self.store.clone(), self.tick);
        }
        report
    }

    /// Tick until the tick limit is reached or a stop is requested,
    /// sleeping the configured interval between ticks.
    pub fn run(&mut self, control: &HostControl) -> HostRunSummary {
        let mut summary = HostRunSummary {
            end_reason: HostEndReason::StopRequested,
            total_ticks: 0,
            tasks_run: 0,
            tasks_failed: 0,
            tasks_abandoned: 0,
        };

        info!(
            max_ticks = control.max_ticks(),
            tick_interval_ms = control.tick_interval_ms(),
            snapshot_reads = self.snapshot.is_some(),
            "Simulation host starting"
        );

        loop {
            if control.is_stop_requested() {
                info!(tick = self.tick, "Stop requested");
                summary.end_reason = HostEndReason::StopRequested;
                break;
            }

            let report = self.tick();
            summary.total_ticks = summary.total_ticks.saturating_add(1);
            summary.tasks_run = summary.tasks_run.saturating_add(u64::from(report.ran));
            summary.tasks_failed = summary.tasks_failed.saturating_add(u64::from(report.failed));

            if control.tick_limit_reached(self.tick) {
                info!(tick = self.tick, max_ticks = control.max_ticks(), "Tick limit reached");
                summary.end_reason = HostEndReason::MaxTicksReached;
                break;
            }

            let interval_ms = control.tick_interval_ms();
            if interval_ms > 0 {
                thread::sleep(Duration::from_millis(interval_ms));
            } else {
                thread::yield_now();
            }
        }

        // Whatever arrived during the last sleep still gets an answer.
        let report = self.queue.drain_all(&mut self.store);
        summary.tasks_run = summary.tasks_run.saturating_add(u64::from(report.ran));
        summary.tasks_failed = summary.tasks_failed.saturating_add(u64::from(report.failed));
        // No drain follows, so nothing may wait on this queue any more.
        let abandoned = self.queue.close();
        summary.tasks_abandoned = u64::try_from(abandoned).unwrap_or(u64::MAX);

        log_host_end(&summary, control);
        summary
    }
}

impl<W: EntityStore + Clone + Send + Sync + 'static> SimulationHost<W> {
    /// Move the host onto a dedicated `warden-sim` thread and run it there.
    /// The store comes back with the summary when the loop ends.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(
        mut self,
        control: Arc<HostControl>,
    ) -> std::io::Result<JoinHandle<(HostRunSummary, W)>> {
        thread::Builder::new()
            .name("warden-sim".to_owned())
            .spawn(move || {
                let summary = self.run(&control);
                (summary, self.into_store())
            })
    }
}

/// Log the end of a host run.
fn log_host_end(summary: &HostRunSummary, control: &HostControl) {
    info!(
        reason = ?summary.end_reason,
        total_ticks = summary.total_ticks,
        tasks_run = summary.tasks_run,
        tasks_failed = summary.tasks_failed,
        tasks_abandoned = summary.tasks_abandoned,
        elapsed_seconds = control.elapsed_seconds(),
        "Simulation host stopped"
    );
}
