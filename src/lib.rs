/*!
 * MLFQ Kernel Library
 * Multi-core multi-level feedback queue scheduler and its trace-driven simulation
 */

pub mod core;
pub mod monitoring;
pub mod process;
pub mod simulation;

// Re-exports
pub use crate::core::{
    ConfigError, CoreId, KernelConfig, KernelError, KernelResult, Level, Pid, RunStatus,
    SchedulerConfig, SchedulerError, SimulationConfig, TraceError,
};
pub use monitoring::{init_tracing, RunSpan};
pub use process::{
    BoostOutcome, Dispatch, EstimateSample, EstimateUpdate, Executor, IoStarter, ProcessHandle,
    ProcessRecord, ProcessState, ReadyQueue, Scheduler, SchedulerBuilder, SchedulerStats, ShutdownReport, StarvationMonitors,
    WorkerSummary,
};
pub use simulation::{ProcessSpec, Report, SimulatedOs, Simulation, Summary, Trace};
