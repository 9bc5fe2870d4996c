/*!
 * Simulated Machine
 *
 * Implements the execution and I/O primitives on top of a trace. Running a
 * process sleeps the worker thread for the consumed part of its burst; I/O is
 * handed to the async driver as a timer request.
 */

use super::trace::{ProcessSpec, Trace};
use crate::core::config::SimulationConfig;
use crate::core::types::{CoreId, Pid, RunStatus};
use crate::process::record::ProcessHandle;
use crate::process::traits::{Executor, IoStarter};
use ahash::HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

/// Request to re-submit a process once its I/O wait elapses
#[derive(Debug)]
pub struct IoRequest {
    pub process: ProcessHandle,
    pub delay: Duration,
}

/// Timestamps of one CPU burst, relative to the simulation start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstTiming {
    /// Process became ready: arrival for the first burst, I/O completion after
    pub ready: Option<Duration>,
    /// Burst first got a core
    pub first_run: Option<Duration>,
    /// Burst ran to its end
    pub completed: Option<Duration>,
}

/// Per-process progress through its bursts
#[derive(Debug)]
struct Account {
    spec: ProcessSpec,
    burst_remaining: Duration,
    bursts_left: u32,
    timings: Vec<BurstTiming>,
}

impl Account {
    /// Timing slot of the burst currently in progress
    fn current(&mut self) -> Option<&mut BurstTiming> {
        let index = self.spec.burst_count.saturating_sub(self.bursts_left) as usize;
        self.timings.get_mut(index)
    }
}

/// Last process seen by a core
#[derive(Debug, Default)]
struct CoreContext {
    last: Option<Pid>,
    switches: u64,
}

/// Burst timings of one finished (or unfinished) process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub spec: ProcessSpec,
    pub bursts: Vec<BurstTiming>,
}

pub struct SimulatedOs {
    accounts: HashMap<Pid, Mutex<Account>>,
    cores: Box<[Mutex<CoreContext>]>,
    context_switch: Duration,
    time_unit: Duration,
    epoch: Instant,
    io_requests: UnboundedSender<IoRequest>,
    context_switches: AtomicU64,
    done: AtomicUsize,
    all_done: Notify,
}

impl SimulatedOs {
    pub fn new(
        trace: &Trace,
        config: &SimulationConfig,
        io_requests: UnboundedSender<IoRequest>,
    ) -> Self {
        let accounts = trace
            .processes()
            .iter()
            .map(|spec| {
                let account = Account {
                    spec: *spec,
                    burst_remaining: spec.burst_duration(config.time_unit),
                    bursts_left: spec.burst_count,
                    timings: vec![BurstTiming::default(); spec.burst_count as usize],
                };
                (spec.pid, Mutex::new(account))
            })
            .collect();

        Self {
            accounts,
            cores: (0..config.cores)
                .map(|_| Mutex::new(CoreContext::default()))
                .collect(),
            context_switch: config.context_switch,
            time_unit: config.time_unit,
            epoch: Instant::now(),
            io_requests,
            context_switches: AtomicU64::new(0),
            done: AtomicUsize::new(0),
            all_done: Notify::new(),
        }
    }

    /// Time since the machine was created
    #[inline]
    pub fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Record that the next burst of a process is ready to run
    ///
    /// Called when the process arrives and whenever its I/O completes.
    pub fn mark_ready(&self, pid: Pid) {
        let Some(account) = self.accounts.get(&pid) else {
            return;
        };
        let now = self.now();
        if let Some(timing) = account.lock().current() {
            timing.ready.get_or_insert(now);
        }
    }

    pub fn total(&self) -> usize {
        self.accounts.len()
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.done() >= self.total()
    }

    /// Resolves once every process has finished its last burst
    pub async fn all_done(&self) {
        while !self.is_finished() {
            self.all_done.notified().await;
        }
    }

    pub fn context_switches(&self) -> u64 {
        self.context_switches.load(Ordering::Relaxed)
    }

    /// Context switches charged on one core
    pub fn core_switches(&self, core: CoreId) -> Option<u64> {
        self.cores.get(core).map(|ctx| ctx.lock().switches)
    }

    /// Timestamps of every process, ordered by pid
    pub fn outcomes(&self) -> Vec<ProcessOutcome> {
        let mut outcomes: Vec<ProcessOutcome> = self
            .accounts
            .values()
            .map(|account| {
                let account = account.lock();
                ProcessOutcome {
                    spec: account.spec,
                    bursts: account.timings.clone(),
                }
            })
            .collect();
        outcomes.sort_by_key(|outcome| outcome.spec.pid);
        outcomes
    }

    fn switch_to(&self, core: CoreId, pid: Pid) {
        let Some(ctx) = self.cores.get(core) else {
            return;
        };
        let mut ctx = ctx.lock();
        if ctx.last == Some(pid) {
            return;
        }
        ctx.last = Some(pid);
        ctx.switches += 1;
        drop(ctx);

        self.context_switches.fetch_add(1, Ordering::Relaxed);
        trace!(core, pid, "Context switch");
        if !self.context_switch.is_zero() {
            thread::sleep(self.context_switch);
        }
    }
}

impl Executor for SimulatedOs {
    fn run(&self, pid: Pid, core: CoreId, time_slice: Duration) -> RunStatus {
        let Some(account) = self.accounts.get(&pid) else {
            warn!(pid, core, "Run requested for unknown process");
            return RunStatus::Done;
        };

        self.switch_to(core, pid);

        let mut account = account.lock();
        let started = self.now();
        if let Some(timing) = account.current() {
            timing.first_run.get_or_insert(started);
        }

        let remaining = account.burst_remaining;
        if !time_slice.is_zero() && time_slice < remaining {
            thread::sleep(time_slice);
            account.burst_remaining = remaining - time_slice;
            return RunStatus::Preempted;
        }

        thread::sleep(remaining);
        let finished = self.now();
        if let Some(timing) = account.current() {
            timing.completed = Some(finished);
        }
        account.bursts_left = account.bursts_left.saturating_sub(1);
        if account.bursts_left == 0 {
            account.burst_remaining = Duration::ZERO;
            drop(account);

            let done = self.done.fetch_add(1, Ordering::AcqRel) + 1;
            debug!(pid, core, done, total = self.total(), "Process completed");
            if done >= self.total() {
                self.all_done.notify_one();
            }
            return RunStatus::Done;
        }

        account.burst_remaining = account.spec.burst_duration(self.time_unit);
        RunStatus::Blocked
    }
}

impl IoStarter for SimulatedOs {
    fn start_io(&self, process: ProcessHandle) {
        let pid = process.pid();
        let delay = match self.accounts.get(&pid) {
            Some(account) => account.lock().spec.io_duration(self.time_unit),
            None => {
                warn!(pid, "I/O requested for unknown process");
                return;
            }
        };

        trace!(pid, ?delay, "I/O started");
        if self.io_requests.send(IoRequest { process, delay }).is_err() {
            warn!(pid, "I/O completion dropped: driver has stopped");
        }
    }
}
