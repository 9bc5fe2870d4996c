/*!
 * Ready Queue
 * Multi-level feedback queue with per-level locks and an adaptive quantum estimator
 */

use super::record::ProcessHandle;
use crate::core::config::SchedulerConfig;
use crate::core::types::Level;
use atomic_stats::AtomicSchedulerStats;
use estimator::QuantumEstimator;
use level::LevelQueue;
use parking_lot::{Condvar, Mutex};
use tracing::info;

pub mod atomic_stats;
mod estimator;
mod level;
mod operations;

pub use atomic_stats::SchedulerStats;
pub use estimator::EstimateSample;
pub use operations::{BoostOutcome, EstimateUpdate};

/// Item stored in a ready queue level
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// A process ready to run
    Process(ProcessHandle),
    /// Sentinel telling the worker that pops it to terminate
    PoisonPill,
}

impl Dispatch {
    #[inline(always)]
    pub fn is_poison_pill(&self) -> bool {
        matches!(self, Self::PoisonPill)
    }

    /// The process carried by this item, if any
    pub fn into_process(self) -> Option<ProcessHandle> {
        match self {
            Self::Process(process) => Some(process),
            Self::PoisonPill => None,
        }
    }
}

/// Thread-safe multi-level ready queue
///
/// # Locking
/// - One lock per level: push/pop on different levels never contend
/// - A level lock is always acquired before a record lock
/// - `signal` only guards the condition variable used by blocked `pop` callers
///
/// # Performance
/// - Cache-line aligned, lock-free atomic length counters and stats
#[repr(C, align(64))]
pub struct ReadyQueue {
    levels: Box<[LevelQueue]>,
    signal: Mutex<()>,
    available: Condvar,
    estimator: QuantumEstimator,
    config: SchedulerConfig,
    stats: AtomicSchedulerStats,
}

impl ReadyQueue {
    /// Create a ready queue with one level per configured priority
    pub fn new(config: &SchedulerConfig) -> Self {
        let levels = config.levels.max(1);
        info!(
            levels,
            top_quantum = ?config.top_quantum,
            default_quantum = ?config.default_quantum,
            "Ready queue initialized"
        );

        Self {
            levels: (0..levels).map(|_| LevelQueue::new()).collect(),
            signal: Mutex::new(()),
            available: Condvar::new(),
            estimator: QuantumEstimator::new(config.alpha_rise, config.alpha_fall),
            config: config.clone(),
            stats: AtomicSchedulerStats::new(),
        }
    }

    /// Number of priority levels
    #[inline(always)]
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    /// Lowest priority level
    #[inline(always)]
    pub fn lowest_level(&self) -> Level {
        self.levels.len() - 1
    }

    /// Scheduling parameters this queue was built with
    #[inline(always)]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Lock-free statistics counters
    #[inline(always)]
    pub fn counters(&self) -> &AtomicSchedulerStats {
        &self.stats
    }

    /// Snapshot of scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot(
            self.estimator.estimate(),
            self.estimator.samples(),
            self.size(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::record::ProcessRecord;
    use std::sync::Arc;

    #[test]
    fn test_new_queue_is_empty() {
        let queue = ReadyQueue::new(&SchedulerConfig::default());
        assert_eq!(queue.levels(), 4);
        assert_eq!(queue.lowest_level(), 3);
        assert!(queue.is_empty());
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn test_dispatch_into_process() {
        let record = ProcessRecord::shared(1);
        let dispatch = Dispatch::Process(Arc::clone(&record));
        assert!(!dispatch.is_poison_pill());
        assert!(Arc::ptr_eq(&dispatch.into_process().unwrap(), &record));
        assert!(Dispatch::PoisonPill.into_process().is_none());
    }

    #[test]
    fn test_stats_snapshot_reports_queue_length() {
        let queue = ReadyQueue::new(&SchedulerConfig::default());
        queue.push(ProcessRecord::shared(1)).unwrap();
        queue.push(ProcessRecord::shared(2)).unwrap();

        let stats = queue.stats();
        assert_eq!(stats.pushes, 2);
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.estimate_samples, 0);
    }
}
