/*!
 * Lock-Free Scheduler Statistics
 * Uses atomic counters for zero-contention stats tracking in hot scheduling paths
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time scheduler statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub pushes: u64,
    pub pops: u64,
    pub removals: u64,
    /// Slices that ended because the time slice or quantum expired
    pub preemptions: u64,
    /// Quanta cut short because interactive work became ready
    pub micro_preemptions: u64,
    pub demotions: u64,
    pub boosts: u64,
    pub blocked: u64,
    pub completed: u64,
    pub quantum_estimate_micros: Option<u64>,
    pub estimate_samples: u64,
    /// Approximate number of queued items when the snapshot was taken
    pub queued: usize,
}

/// Atomic scheduler statistics for lock-free updates
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering for maximum performance
#[repr(C, align(64))]
pub struct AtomicSchedulerStats {
    pushes: AtomicU64,
    pops: AtomicU64,
    removals: AtomicU64,
    preemptions: AtomicU64,
    micro_preemptions: AtomicU64,
    demotions: AtomicU64,
    boosts: AtomicU64,
    blocked: AtomicU64,
    completed: AtomicU64,
}

impl AtomicSchedulerStats {
    #[inline]
    pub fn new() -> Self {
        Self {
            pushes: AtomicU64::new(0),
            pops: AtomicU64::new(0),
            removals: AtomicU64::new(0),
            preemptions: AtomicU64::new(0),
            micro_preemptions: AtomicU64::new(0),
            demotions: AtomicU64::new(0),
            boosts: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn inc_pushes(&self) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_pops(&self) {
        self.pops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_removals(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_preemptions(&self) {
        self.preemptions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_micro_preemptions(&self) {
        self.micro_preemptions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_demotions(&self) {
        self.demotions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_boosts(&self) {
        self.boosts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    ///
    /// # Note
    /// Counter values may not be perfectly consistent with each other due to concurrent updates,
    /// but each individual value is accurate. This is acceptable for monitoring.
    pub fn snapshot(
        &self,
        estimate: Option<Duration>,
        estimate_samples: u64,
        queued: usize,
    ) -> SchedulerStats {
        SchedulerStats {
            pushes: self.pushes.load(Ordering::Relaxed),
            pops: self.pops.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            preemptions: self.preemptions.load(Ordering::Relaxed),
            micro_preemptions: self.micro_preemptions.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
            boosts: self.boosts.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            quantum_estimate_micros: estimate.map(|d| d.as_micros() as u64),
            estimate_samples,
            queued,
        }
    }
}

impl Default for AtomicSchedulerStats {
    fn default() -> Self {
        Self::new()
    }
}
