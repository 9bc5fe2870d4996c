/*!
 * Scheduler
 * Owns the ready queue, the core workers and the starvation monitors
 */

use super::manager_builder::SchedulerBuilder;
use super::monitor::StarvationMonitors;
use super::record::ProcessHandle;
use super::scheduler::{ReadyQueue, SchedulerStats};
use super::traits::{Executor, IoStarter};
use super::worker::{Worker, WorkerHandle, WorkerSummary};
use crate::core::config::SchedulerConfig;
use crate::core::errors::SchedulerError;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Errors raised on worker or monitor threads, surfaced to the owner
pub(crate) struct FaultLog {
    faults: Mutex<Vec<SchedulerError>>,
}

impl FaultLog {
    pub fn new() -> Self {
        Self {
            faults: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, fault: SchedulerError) {
        self.faults.lock().push(fault);
    }

    pub fn take_first(&self) -> Option<SchedulerError> {
        let mut faults = self.faults.lock();
        if faults.is_empty() {
            None
        } else {
            Some(faults.remove(0))
        }
    }
}

/// Shared state handed to every worker
pub(crate) struct WorkerContext {
    pub queue: Arc<ReadyQueue>,
    pub executor: Arc<dyn Executor>,
    pub io: Arc<dyn IoStarter>,
    pub monitors: Arc<StarvationMonitors>,
    pub faults: Arc<FaultLog>,
}

/// Outcome of a graceful shutdown
#[derive(Debug, Clone, Serialize)]
pub struct ShutdownReport {
    pub workers: Vec<WorkerSummary>,
    pub monitors_joined: usize,
    pub stats: SchedulerStats,
}

/// Multi-core MLFQ scheduler
///
/// **Shutdown Pattern: Graceful-with-Fallback**
/// - Preferred: `shutdown()` sends one poison pill per worker and joins
///   workers and monitors
/// - Fallback: Drop sends the poison pills and cancels monitors without joining
pub struct Scheduler {
    ctx: Arc<WorkerContext>,
    workers: Mutex<Vec<WorkerHandle>>,
}

impl Scheduler {
    /// Create a builder
    pub fn builder(executor: Arc<dyn Executor>, io: Arc<dyn IoStarter>) -> SchedulerBuilder {
        SchedulerBuilder::new(executor, io)
    }

    pub(crate) fn from_parts(
        config: &SchedulerConfig,
        executor: Arc<dyn Executor>,
        io: Arc<dyn IoStarter>,
    ) -> Self {
        let faults = Arc::new(FaultLog::new());
        let ctx = Arc::new(WorkerContext {
            queue: Arc::new(ReadyQueue::new(config)),
            executor,
            io,
            monitors: Arc::new(StarvationMonitors::new(
                config.boost_interval,
                Arc::clone(&faults),
            )),
            faults,
        });

        Self {
            ctx,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn one worker per core
    pub fn start(&self, cores: usize) -> Result<(), SchedulerError> {
        let mut workers = self.workers.lock();
        let first = workers.len();
        for core in first..first + cores {
            let handle = Worker::new(core, Arc::clone(&self.ctx)).spawn()?;
            workers.push(handle);
        }
        info!(cores = workers.len(), "Scheduler started");
        Ok(())
    }

    /// Submit a newly arrived or unblocked process
    pub fn submit(&self, process: ProcessHandle) -> Result<(), SchedulerError> {
        self.ctx.queue.push(process)
    }

    /// The shared ready queue
    #[inline(always)]
    pub fn queue(&self) -> &Arc<ReadyQueue> {
        &self.ctx.queue
    }

    /// Number of running workers
    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Snapshot of scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        self.ctx.queue.stats()
    }

    /// First error raised on a worker or monitor thread, if any
    pub fn take_fault(&self) -> Option<SchedulerError> {
        self.ctx.faults.take_first()
    }

    /// Stop all workers and monitors
    pub fn shutdown(&self) -> Result<ShutdownReport, SchedulerError> {
        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return Err(SchedulerError::NotRunning);
        }

        for _ in &workers {
            self.ctx.queue.push_poison_pill()?;
        }

        let mut summaries = Vec::with_capacity(workers.len());
        let mut first_error = None;
        for worker in workers {
            let core = worker.core();
            match worker.join() {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!(core, error = %e, "Worker exited with error");
                    first_error.get_or_insert(e);
                }
            }
        }

        let monitors_joined = self.ctx.monitors.shutdown();
        if let Some(e) = first_error {
            return Err(e);
        }

        let stats = self.stats();
        info!(
            workers = summaries.len(),
            monitors_joined,
            completed = stats.completed,
            "Scheduler shut down"
        );

        Ok(ShutdownReport {
            workers: summaries,
            monitors_joined,
            stats,
        })
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let workers = self.workers.get_mut();
        if workers.is_empty() {
            return;
        }

        warn!(
            workers = workers.len(),
            "Scheduler dropped without calling shutdown() - detaching workers"
        );
        for _ in workers.iter() {
            if self.ctx.queue.push_poison_pill().is_err() {
                break;
            }
        }
        self.ctx.monitors.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CoreId, Pid, RunStatus};
    use crate::process::record::ProcessRecord;
    use std::time::Duration;

    struct InstantDone;

    impl Executor for InstantDone {
        fn run(&self, _pid: Pid, _core: CoreId, _slice: Duration) -> RunStatus {
            RunStatus::Done
        }
    }

    impl IoStarter for InstantDone {
        fn start_io(&self, _process: ProcessHandle) {}
    }

    #[test]
    fn test_fault_log_order() {
        let log = FaultLog::new();
        assert!(log.take_first().is_none());
        log.record(SchedulerError::WorkerPanicked(0));
        log.record(SchedulerError::WorkerPanicked(1));
        assert_eq!(log.take_first(), Some(SchedulerError::WorkerPanicked(0)));
        assert_eq!(log.take_first(), Some(SchedulerError::WorkerPanicked(1)));
    }

    #[test]
    fn test_shutdown_without_start() {
        let machine = Arc::new(InstantDone);
        let scheduler = Scheduler::builder(machine.clone(), machine).build().unwrap();
        assert!(matches!(scheduler.shutdown(), Err(SchedulerError::NotRunning)));
    }

    #[test]
    fn test_start_submit_shutdown() {
        let machine = Arc::new(InstantDone);
        let scheduler = Scheduler::builder(machine.clone(), machine).build().unwrap();
        scheduler.start(2).unwrap();
        assert_eq!(scheduler.worker_count(), 2);

        for pid in 0..4 {
            scheduler.submit(ProcessRecord::shared(pid)).unwrap();
        }

        let report = scheduler.shutdown().unwrap();
        assert_eq!(report.workers.len(), 2);
        let dispatched: u64 = report.workers.iter().map(|w| w.dispatched).sum();
        assert_eq!(dispatched, 4);
        assert_eq!(report.stats.completed, 4);
        assert_eq!(scheduler.worker_count(), 0);
    }
}
