/*!
 * Starvation Monitor
 *
 * A demoted process gets one background monitor. After the boost interval the
 * monitor forces the process back to the top level unless it finished or was
 * promoted in the meantime, bounding how long a ready process can wait below
 * top priority.
 *
 * Monitors are tracked and joined at shutdown. Shutdown cancels the wait so
 * joining never blocks for a full boost interval.
 */

use super::manager::FaultLog;
use super::record::ProcessHandle;
use super::scheduler::{BoostOutcome, ReadyQueue};
use crate::core::errors::SchedulerError;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cancellable wait shared by all monitors
struct CancelSignal {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancelSignal {
    fn new() -> Self {
        Self {
            cancelled: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Sleep for `duration`; returns true if cancelled first
    fn wait_for(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.cancelled.lock();
        while !*cancelled {
            if self.condvar.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }

    fn cancel(&self) {
        *self.cancelled.lock() = true;
        self.condvar.notify_all();
    }

    fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }
}

/// Registry of outstanding starvation monitors
pub struct StarvationMonitors {
    handles: DashMap<u64, JoinHandle<()>, RandomState>,
    next_id: AtomicU64,
    cancel: Arc<CancelSignal>,
    interval: Duration,
    faults: Arc<FaultLog>,
}

impl StarvationMonitors {
    pub(crate) fn new(interval: Duration, faults: Arc<FaultLog>) -> Self {
        Self {
            handles: DashMap::with_hasher(RandomState::new()),
            next_id: AtomicU64::new(0),
            cancel: Arc::new(CancelSignal::new()),
            interval,
            faults,
        }
    }

    /// Number of monitors not yet reaped
    pub fn outstanding(&self) -> usize {
        self.handles.len()
    }

    /// Start a monitor for a demoted process
    ///
    /// The caller sets `boost_pending` on the record; the monitor clears it on exit.
    pub fn spawn(
        &self,
        queue: Arc<ReadyQueue>,
        process: ProcessHandle,
    ) -> Result<(), SchedulerError> {
        let pid = process.pid();
        if self.is_cancelled() {
            return Err(SchedulerError::MonitorSpawn {
                pid,
                reason: "monitors are shut down".to_string(),
            });
        }
        self.reap();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = Arc::clone(&self.cancel);
        let faults = Arc::clone(&self.faults);
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name(format!("boost-{}", pid))
            .spawn(move || watch(queue, process, cancel, faults, interval))
            .map_err(|e| SchedulerError::MonitorSpawn {
                pid,
                reason: e.to_string(),
            })?;

        self.handles.insert(id, handle);
        debug!(pid, ?interval, "Starvation monitor spawned");
        Ok(())
    }

    /// Cancel every monitor and join them; returns how many were joined
    pub fn shutdown(&self) -> usize {
        self.cancel.cancel();

        let ids: Vec<u64> = self.handles.iter().map(|entry| *entry.key()).collect();
        let mut joined = 0;
        for id in ids {
            if let Some((_, handle)) = self.handles.remove(&id) {
                if handle.join().is_err() {
                    warn!(monitor = id, "Starvation monitor panicked");
                }
                joined += 1;
            }
        }

        info!(joined, "Starvation monitors shut down");
        joined
    }

    /// Cancel without joining (fallback when the owner is dropped)
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drop handles of monitors that already exited
    fn reap(&self) {
        self.handles.retain(|_, handle| !handle.is_finished());
    }
}

fn watch(
    queue: Arc<ReadyQueue>,
    process: ProcessHandle,
    cancel: Arc<CancelSignal>,
    faults: Arc<FaultLog>,
    interval: Duration,
) {
    let pid = process.pid();

    if cancel.wait_for(interval) {
        process.lock().boost_pending = false;
        debug!(pid, "Starvation monitor cancelled");
        return;
    }

    match queue.boost(&process) {
        Ok(BoostOutcome::Requeued) => debug!(pid, "Starved process requeued at top level"),
        Ok(BoostOutcome::Promoted) => debug!(pid, "Starved process promoted to top level"),
        Ok(BoostOutcome::Skipped) => debug!(pid, "Starvation boost skipped"),
        Err(e) => {
            warn!(pid, error = %e, "Starvation boost failed");
            process.lock().boost_pending = false;
            faults.record(e);
        }
    }
}
