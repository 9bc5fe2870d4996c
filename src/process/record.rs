/*!
 * Process Record
 * Mutable scheduling state of one simulated process
 */

use super::scheduler::EstimateSample;
use crate::core::types::{Level, Pid, RunStatus};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a process record
pub type ProcessHandle = Arc<ProcessRecord>;

/// Fields guarded by the record lock
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessState {
    /// Current priority level (0 is the highest)
    pub level: Level,
    /// CPU time consumed by the current unfinished burst
    pub burst_length: Duration,
    /// Last result of the execution primitive
    pub status: Option<RunStatus>,
    /// Sample this process contributed to the quantum estimate, if any
    pub counted_sample: Option<EstimateSample>,
    /// A starvation monitor is outstanding for this process
    pub boost_pending: bool,
    /// The record currently sits in a ready queue level
    pub(crate) queued: bool,
}

impl ProcessState {
    fn new() -> Self {
        Self {
            level: 0,
            burst_length: Duration::ZERO,
            status: None,
            counted_sample: None,
            boost_pending: false,
            queued: false,
        }
    }

    #[inline(always)]
    pub fn counted_in_estimate(&self) -> bool {
        self.counted_sample.is_some()
    }

    #[inline(always)]
    pub fn is_done(&self) -> bool {
        self.status == Some(RunStatus::Done)
    }

    #[inline(always)]
    pub fn is_queued(&self) -> bool {
        self.queued
    }
}

/// Scheduling record of a simulated process
///
/// All mutable fields live behind one lock; at most one thread mutates them at
/// a time. When a level lock is also needed it must be taken first.
pub struct ProcessRecord {
    pid: Pid,
    state: Mutex<ProcessState>,
}

impl ProcessRecord {
    /// Create a record entering at the top level
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            state: Mutex::new(ProcessState::new()),
        }
    }

    /// Create a shared record
    pub fn shared(pid: Pid) -> ProcessHandle {
        Arc::new(Self::new(pid))
    }

    /// Create a shared record starting at a given level
    pub fn shared_at(pid: Pid, level: Level) -> ProcessHandle {
        let record = Self::new(pid);
        record.state.lock().level = level;
        Arc::new(record)
    }

    #[inline(always)]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Acquire the record lock
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, ProcessState> {
        self.state.lock()
    }

    /// Current level (takes the record lock briefly)
    pub fn level(&self) -> Level {
        self.state.lock().level
    }

    /// Copy of the guarded fields (takes the record lock briefly)
    pub fn snapshot(&self) -> ProcessState {
        self.state.lock().clone()
    }
}

impl fmt::Debug for ProcessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ProcessRecord");
        debug.field("pid", &self.pid);
        match self.state.try_lock() {
            Some(state) => debug.field("state", &*state),
            None => debug.field("state", &"<locked>"),
        };
        debug.finish()
    }
}
