/*!
 * Core Worker
 *
 * One thread per simulated core. Pops the highest-priority process, runs it
 * through the execution primitive and reclassifies it:
 * - Preempted: demoted one level, starvation monitor armed, re-queued
 * - Blocked: burst folded into the estimate, promoted to the top, handed to I/O
 * - Done: estimate contribution retracted, retired
 *
 * Below the top level the quantum is split into micro-quanta so interactive
 * work waits at most one micro-quantum behind a background process.
 */

use super::manager::WorkerContext;
use super::record::{ProcessHandle, ProcessState};
use super::scheduler::{Dispatch, EstimateUpdate};
use crate::core::errors::SchedulerError;
use crate::core::types::{CoreId, Level, Pid, RunStatus};
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// What a worker did before it exited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub core: CoreId,
    pub dispatched: u64,
}

/// Handle to a running worker thread
pub struct WorkerHandle {
    core: CoreId,
    handle: JoinHandle<Result<WorkerSummary, SchedulerError>>,
}

impl WorkerHandle {
    #[inline(always)]
    pub fn core(&self) -> CoreId {
        self.core
    }

    /// Wait for the worker to exit
    pub fn join(self) -> Result<WorkerSummary, SchedulerError> {
        self.handle
            .join()
            .map_err(|_| SchedulerError::WorkerPanicked(self.core))?
    }
}

pub struct Worker {
    core: CoreId,
    ctx: Arc<WorkerContext>,
}

impl Worker {
    pub(crate) fn new(core: CoreId, ctx: Arc<WorkerContext>) -> Self {
        Self { core, ctx }
    }

    /// Start the worker loop on its own thread
    pub(crate) fn spawn(self) -> Result<WorkerHandle, SchedulerError> {
        let core = self.core;
        let handle = thread::Builder::new()
            .name(format!("core-{}", core))
            .spawn(move || self.run())
            .map_err(|e| SchedulerError::WorkerSpawn {
                core,
                reason: e.to_string(),
            })?;
        Ok(WorkerHandle { core, handle })
    }

    fn run(self) -> Result<WorkerSummary, SchedulerError> {
        info!(core = self.core, "Worker started");
        let mut dispatched = 0;

        loop {
            let process = match self.ctx.queue.pop() {
                Dispatch::Process(process) => process,
                Dispatch::PoisonPill => break,
            };
            dispatched += 1;

            if let Err(e) = self.dispatch(process) {
                error!(core = self.core, error = %e, "Worker stopping on scheduler error");
                self.ctx.faults.record(e.clone());
                return Err(e);
            }
        }

        info!(core = self.core, dispatched, "Worker received poison pill");
        Ok(WorkerSummary {
            core: self.core,
            dispatched,
        })
    }

    /// Run one popped process and apply the resulting status
    fn dispatch(&self, process: ProcessHandle) -> Result<(), SchedulerError> {
        let queue = &self.ctx.queue;
        let stats = queue.counters();
        let pid = process.pid();

        let mut state = process.lock();
        let level = state.level;
        let quantum = queue.quantum_for(level);
        trace!(core = self.core, pid, level, ?quantum, "Dispatching");

        let status = self.execute(pid, &mut state, level, quantum);
        state.status = Some(status);

        match status {
            RunStatus::Preempted => {
                stats.inc_preemptions();
                let demoted = (level + 1).min(queue.lowest_level());
                if demoted != level {
                    stats.inc_demotions();
                }
                state.level = demoted;

                if demoted > 0 && !state.boost_pending {
                    state.boost_pending = true;
                    if let Err(e) = self
                        .ctx
                        .monitors
                        .spawn(Arc::clone(queue), Arc::clone(&process))
                    {
                        warn!(pid, error = %e, "Starvation monitor not started");
                        state.boost_pending = false;
                    }
                }
                debug!(core = self.core, pid, from = level, to = demoted, "Process preempted");

                // Never push while holding the record lock
                drop(state);
                queue.push(process)?;
            }
            RunStatus::Blocked => {
                stats.inc_blocked();
                let observed = state.burst_length;
                let update =
                    queue.update_estimate(RunStatus::Blocked, observed, state.counted_sample.as_ref());
                if let EstimateUpdate::Folded(sample) = update {
                    state.counted_sample = Some(sample);
                }
                state.burst_length = Duration::ZERO;
                state.level = 0;
                debug!(core = self.core, pid, ?observed, "Process blocked on I/O");

                drop(state);
                self.ctx.io.start_io(process);
            }
            RunStatus::Done => {
                stats.inc_completed();
                if let Some(sample) = state.counted_sample.take() {
                    queue.update_estimate(RunStatus::Done, sample.burst, Some(&sample));
                }
                state.burst_length = Duration::ZERO;
                debug!(core = self.core, pid, "Process done");
            }
        }

        Ok(())
    }

    /// Run for up to `quantum`, in micro-quanta below the top level
    fn execute(
        &self,
        pid: Pid,
        state: &mut ProcessState,
        level: Level,
        quantum: Duration,
    ) -> RunStatus {
        if level == 0 {
            return self.run_slice(pid, state, quantum);
        }

        let queue = &self.ctx.queue;
        let micro = quantum.min(queue.config().micro_quantum_max);
        let mut used = Duration::ZERO;

        loop {
            let slice = micro.min(quantum - used);
            let status = self.run_slice(pid, state, slice);
            used += slice;

            if status.ends_burst() || used >= quantum {
                return status;
            }
            if queue.level_len(0) > 0 {
                queue.counters().inc_micro_preemptions();
                debug!(core = self.core, pid, ?used, "Yielding to interactive work");
                return RunStatus::Preempted;
            }
        }
    }

    fn run_slice(&self, pid: Pid, state: &mut ProcessState, slice: Duration) -> RunStatus {
        let started = Instant::now();
        let status = self.ctx.executor.run(pid, self.core, slice);
        if !state.counted_in_estimate() {
            state.burst_length += started.elapsed();
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SchedulerConfig;
    use crate::process::manager::FaultLog;
    use crate::process::monitor::StarvationMonitors;
    use crate::process::record::ProcessRecord;
    use crate::process::scheduler::ReadyQueue;
    use crate::process::traits::{MockExecutor, MockIoStarter};
    use mockall::predicate::*;

    fn context(executor: MockExecutor, io: MockIoStarter) -> Arc<WorkerContext> {
        let config = SchedulerConfig {
            boost_interval: Duration::from_secs(60),
            ..SchedulerConfig::default()
        };
        let faults = Arc::new(FaultLog::new());
        Arc::new(WorkerContext {
            queue: Arc::new(ReadyQueue::new(&config)),
            executor: Arc::new(executor),
            io: Arc::new(io),
            monitors: Arc::new(StarvationMonitors::new(config.boost_interval, Arc::clone(&faults))),
            faults,
        })
    }

    #[test]
    fn test_top_level_runs_single_full_quantum() {
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .with(eq(1), eq(0), eq(Duration::from_millis(10)))
            .times(1)
            .returning(|_, _, _| RunStatus::Preempted);

        let ctx = context(executor, MockIoStarter::new());
        let process = ProcessRecord::shared(1);
        Worker::new(0, Arc::clone(&ctx))
            .dispatch(Arc::clone(&process))
            .unwrap();

        let state = process.snapshot();
        assert_eq!(state.level, 1);
        assert!(state.boost_pending);
        assert!(state.is_queued());
        assert_eq!(ctx.queue.counters().snapshot(None, 0, 0).demotions, 1);
        ctx.monitors.shutdown();
    }

    #[test]
    fn test_background_quantum_split_into_micro_quanta() {
        // Default quantum 125ms with a 50ms cap: 50 + 50 + 25
        let mut executor = MockExecutor::new();
        let mut seq = mockall::Sequence::new();
        for slice in [50, 50, 25] {
            executor
                .expect_run()
                .with(eq(3), eq(1), eq(Duration::from_millis(slice)))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _, _| RunStatus::Preempted);
        }

        let mut ctx = context(executor, MockIoStarter::new());
        let config = SchedulerConfig {
            micro_quantum_max: Duration::from_millis(50),
            boost_interval: Duration::from_secs(60),
            ..SchedulerConfig::default()
        };
        Arc::get_mut(&mut ctx).unwrap().queue = Arc::new(ReadyQueue::new(&config));

        let process = ProcessRecord::shared_at(3, 2);
        Worker::new(1, Arc::clone(&ctx))
            .dispatch(Arc::clone(&process))
            .unwrap();

        assert_eq!(process.level(), 3);
        ctx.monitors.shutdown();
    }

    #[test]
    fn test_interactive_arrival_preempts_after_one_micro_quantum() {
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .times(1)
            .returning(|_, _, _| RunStatus::Preempted);

        let ctx = context(executor, MockIoStarter::new());
        ctx.queue.push(ProcessRecord::shared(99)).unwrap();

        let background = ProcessRecord::shared_at(5, 1);
        Worker::new(0, Arc::clone(&ctx))
            .dispatch(Arc::clone(&background))
            .unwrap();

        assert_eq!(background.level(), 2);
        let stats = ctx.queue.stats();
        assert_eq!(stats.micro_preemptions, 1);
        ctx.monitors.shutdown();
    }

    #[test]
    fn test_blocked_promotes_and_starts_io() {
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .returning(|_, _, _| RunStatus::Blocked);
        let mut io = MockIoStarter::new();
        io.expect_start_io()
            .withf(|process| process.pid() == 4)
            .times(1)
            .return_const(());

        let ctx = context(executor, io);
        let process = ProcessRecord::shared_at(4, 2);
        Worker::new(0, Arc::clone(&ctx))
            .dispatch(Arc::clone(&process))
            .unwrap();

        let state = process.snapshot();
        assert_eq!(state.level, 0);
        assert_eq!(state.status, Some(RunStatus::Blocked));
        assert_eq!(state.burst_length, Duration::ZERO);
        assert!(state.counted_in_estimate());
        assert!(!state.is_queued());
        assert_eq!(ctx.queue.estimate_samples(), 1);
    }

    #[test]
    fn test_done_retracts_counted_sample() {
        let mut executor = MockExecutor::new();
        executor.expect_run().returning(|_, _, _| RunStatus::Done);

        let ctx = context(executor, MockIoStarter::new());
        let sample = match ctx
            .queue
            .update_estimate(RunStatus::Blocked, Duration::from_millis(30), None)
        {
            EstimateUpdate::Folded(sample) => sample,
            other => panic!("expected a fold, got {:?}", other),
        };

        let process = ProcessRecord::shared(8);
        process.lock().counted_sample = Some(sample);

        Worker::new(0, Arc::clone(&ctx))
            .dispatch(Arc::clone(&process))
            .unwrap();

        let state = process.snapshot();
        assert!(state.is_done());
        assert!(!state.counted_in_estimate());
        assert_eq!(ctx.queue.estimate_samples(), 0);
        assert_eq!(ctx.queue.size(), 0);
    }

    #[test]
    fn test_poison_pill_stops_worker_without_running() {
        let mut executor = MockExecutor::new();
        executor.expect_run().never();

        let ctx = context(executor, MockIoStarter::new());
        ctx.queue.push_poison_pill().unwrap();

        let summary = Worker::new(2, Arc::clone(&ctx)).spawn().unwrap().join().unwrap();
        assert_eq!(summary, WorkerSummary { core: 2, dispatched: 0 });
    }
}
