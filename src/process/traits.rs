/*!
 * Process Traits
 * Primitives the scheduler consumes from the machine it runs on
 */

use super::record::ProcessHandle;
use crate::core::types::{CoreId, Pid, RunStatus};
use std::time::Duration;

/// Execution primitive
///
/// Runs a process on a core for at most `time_slice` and blocks for the
/// simulated run time. Implementations charge a context switch when the core
/// last ran a different process, and must keep burst progress across repeated
/// calls for the same process.
#[cfg_attr(test, mockall::automock)]
pub trait Executor: Send + Sync {
    fn run(&self, pid: Pid, core: CoreId, time_slice: Duration) -> RunStatus;
}

/// I/O-start primitive
///
/// Non-blocking. When the I/O completes the owner re-submits the process to
/// the ready queue; workers never re-queue a blocked process themselves.
#[cfg_attr(test, mockall::automock)]
pub trait IoStarter: Send + Sync {
    fn start_io(&self, process: ProcessHandle);
}
