//! Auto-refresh timer and fetch sequencing.
//!
//! The timer is a self-rescheduling one-shot: it fires once, the app runs one
//! fetch, and the timer is re-armed when that fetch completes. The scheduler
//! owns the only timer handle; arming always aborts the previous one, and
//! every tick carries the generation it was armed with so a tick that raced
//! its own cancellation is ignored.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::fetch::{SnapshotFetcher, TransportError};
use crate::state::AutoRefresh;
use crate::types::MachineSnapshot;

#[derive(Debug)]
pub enum SchedulerEvent {
    Tick {
        generation: u64,
    },
    Fetched {
        request: u64,
        result: Result<Vec<MachineSnapshot>, TransportError>,
    },
}

pub struct RefreshScheduler {
    tx: UnboundedSender<SchedulerEvent>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
    next_request: u64,
    newest_seen: u64,
    timer_request: Option<u64>,
}

impl RefreshScheduler {
    pub fn new(tx: UnboundedSender<SchedulerEvent>) -> Self {
        Self {
            tx,
            timer: None,
            generation: 0,
            next_request: 0,
            newest_seen: 0,
            timer_request: None,
        }
    }

    /// Number of pending timers; never more than one.
    pub fn pending(&self) -> usize {
        usize::from(self.timer.is_some())
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
            trace!(generation = self.generation, "timer cancelled");
        }
        self.generation += 1;
    }

    /// Cancel whatever is pending, then arm one timer if enabled.
    pub fn reschedule(&mut self, auto: AutoRefresh) {
        self.cancel();
        if auto.enabled {
            self.arm(Duration::from_millis(auto.interval_ms));
        }
    }

    fn arm(&mut self, after: Duration) {
        self.cancel();
        let generation = self.generation;
        let tx = self.tx.clone();
        debug!(generation, ?after, "timer armed");
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(SchedulerEvent::Tick { generation });
        }));
    }

    /// Accept a tick. Returns false for ticks from a superseded timer.
    pub fn on_tick(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.timer.is_none() {
            trace!(generation, current = self.generation, "stale tick ignored");
            return false;
        }
        self.timer = None;
        true
    }

    /// Allocate a request id for a fetch about to start.
    pub fn begin_fetch(&mut self, from_timer: bool) -> u64 {
        self.next_request += 1;
        if from_timer {
            self.timer_request = Some(self.next_request);
        }
        self.next_request
    }

    /// Start a fetch on its own task; its result comes back as
    /// [`SchedulerEvent::Fetched`].
    pub fn spawn_fetch(&mut self, fetcher: &SnapshotFetcher, from_timer: bool) -> u64 {
        let request = self.begin_fetch(from_timer);
        let fetcher = fetcher.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch_latest().await;
            let _ = tx.send(SchedulerEvent::Fetched { request, result });
        });
        request
    }

    /// Book-keeping for a finished fetch. Re-arms the timer when the fetch was
    /// the one a tick started. Returns whether the result is the newest seen so
    /// far and should be applied; older responses are discarded.
    pub fn on_fetched(&mut self, request: u64, auto: AutoRefresh) -> bool {
        if self.timer_request == Some(request) {
            self.timer_request = None;
            if auto.enabled && self.timer.is_none() {
                self.arm(Duration::from_millis(auto.interval_ms));
            }
        }
        if request <= self.newest_seen {
            debug!(request, newest = self.newest_seen, "stale response discarded");
            return false;
        }
        self.newest_seen = request;
        true
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}
