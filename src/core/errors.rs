/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{CoreId, Level, Pid};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheduler-related errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SchedulerError {
    #[error("Failed to grow ready queue level {level}: {reason}")]
    #[diagnostic(
        code(scheduler::queue_allocation),
        help("The simulation ran out of memory while queueing a process. Reduce the workload size.")
    )]
    QueueAllocation { level: Level, reason: String },

    #[error("Priority level {level} out of range (levels: {levels})")]
    #[diagnostic(
        code(scheduler::invalid_level),
        help("A process record carried a level outside the configured range. This is an internal bug.")
    )]
    InvalidLevel { level: Level, levels: usize },

    #[error("Failed to spawn worker for core {core}: {reason}")]
    #[diagnostic(
        code(scheduler::worker_spawn),
        help("The operating system refused to create a thread. Check thread limits.")
    )]
    WorkerSpawn { core: CoreId, reason: String },

    #[error("Failed to spawn starvation monitor for process {pid}: {reason}")]
    #[diagnostic(
        code(scheduler::monitor_spawn),
        help("The operating system refused to create a thread. Check thread limits.")
    )]
    MonitorSpawn { pid: Pid, reason: String },

    #[error("Worker on core {0} panicked")]
    #[diagnostic(
        code(scheduler::worker_panicked),
        help("A worker thread terminated abnormally. View logs for details.")
    )]
    WorkerPanicked(CoreId),

    #[error("Scheduler is not running")]
    #[diagnostic(
        code(scheduler::not_running),
        help("Call start() before submitting work or shutting down.")
    )]
    NotRunning,
}

/// Configuration errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("At least one priority level is required")]
    #[diagnostic(code(config::no_levels))]
    NoLevels,

    #[error("Expected {expected} quantum multipliers for levels 1..{levels}, found {found}")]
    #[diagnostic(
        code(config::multiplier_count),
        help("Provide exactly one multiplier per level below the top level.")
    )]
    MultiplierCount {
        levels: usize,
        expected: usize,
        found: usize,
    },

    #[error("Quantum multiplier for level {level} must be finite and positive, got {value}")]
    #[diagnostic(code(config::invalid_multiplier))]
    InvalidMultiplier { level: Level, value: f64 },

    #[error("Quantum multipliers must not decrease with lower priority (level {level})")]
    #[diagnostic(
        code(config::non_monotonic_multipliers),
        help("Lower priority levels amortize switches over longer runs; order multipliers ascending.")
    )]
    NonMonotonicMultipliers { level: Level },

    #[error("Duration '{0}' must be non-zero")]
    #[diagnostic(code(config::zero_duration))]
    ZeroDuration(String),

    #[error("Estimator weight '{name}' must be in (0, 1], got {value}")]
    #[diagnostic(code(config::invalid_alpha))]
    InvalidAlpha { name: String, value: f64 },

    #[error("At least one core is required")]
    #[diagnostic(code(config::no_cores))]
    NoCores,

    #[error("Invalid value for {var}: {reason}")]
    #[diagnostic(code(config::invalid_env))]
    InvalidEnv { var: String, reason: String },

    #[error("Failed to read configuration: {0}")]
    #[diagnostic(
        code(config::io),
        help("Check that the configuration file exists and is readable.")
    )]
    Io(String),

    #[error("Failed to parse configuration: {0}")]
    #[diagnostic(code(config::parse), help("The configuration file must be valid JSON."))]
    Parse(String),
}

/// Workload trace errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum TraceError {
    #[error("Failed to read trace: {0}")]
    #[diagnostic(code(trace::io), help("Check that the trace file exists and is readable."))]
    Io(String),

    #[error("Trace is empty")]
    #[diagnostic(code(trace::empty), help("The first line must hold the process count."))]
    Empty,

    #[error("Line {line}: invalid process count '{value}'")]
    #[diagnostic(code(trace::invalid_header))]
    InvalidHeader { line: usize, value: String },

    #[error("Line {line}: {reason}")]
    #[diagnostic(
        code(trace::malformed_line),
        help("Expected 'pid; arrival; burst_count; burst_time; io_time'.")
    )]
    MalformedLine { line: usize, reason: String },

    #[error("Trace declares {declared} processes but lists {found}")]
    #[diagnostic(code(trace::count_mismatch))]
    CountMismatch { declared: usize, found: usize },

    #[error("Line {line}: duplicate pid {pid}")]
    #[diagnostic(code(trace::duplicate_pid))]
    DuplicatePid { line: usize, pid: Pid },

    #[error("Line {line}: process {pid} has no CPU bursts")]
    #[diagnostic(code(trace::zero_bursts))]
    ZeroBursts { line: usize, pid: Pid },
}

/// Unified kernel error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error("Scheduler error: {0}")]
    #[diagnostic(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Trace error: {0}")]
    #[diagnostic(transparent)]
    Trace(#[from] TraceError),

    #[error("Internal error: {0}")]
    #[diagnostic(
        code(kernel::internal_error),
        help("An unexpected internal error occurred. Please report this issue.")
    )]
    Internal(String),
}

impl From<String> for KernelError {
    fn from(msg: String) -> Self {
        KernelError::Internal(msg)
    }
}

impl From<&str> for KernelError {
    fn from(msg: &str) -> Self {
        KernelError::Internal(msg.to_string())
    }
}
