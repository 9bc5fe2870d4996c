/*!
 * Process Module
 * Process records, the MLFQ ready queue, core workers and starvation monitors
 */

pub mod manager;
pub mod manager_builder;
pub mod monitor;
pub mod record;
pub mod scheduler;
pub mod traits;
pub mod worker;

// Re-export for convenience
pub use manager::{Scheduler, ShutdownReport};
pub use manager_builder::SchedulerBuilder;
pub use monitor::StarvationMonitors;
pub use record::{ProcessHandle, ProcessRecord, ProcessState};
pub use scheduler::{
    BoostOutcome, Dispatch, EstimateSample, EstimateUpdate, ReadyQueue, SchedulerStats,
};
pub use traits::{Executor, IoStarter};
pub use worker::{WorkerHandle, WorkerSummary};
