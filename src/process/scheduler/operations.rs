/*!
 * Ready Queue Operations
 * Push, pop, remove, boost, and quantum estimation
 */

use super::{Dispatch, EstimateSample, ReadyQueue};
use crate::core::errors::SchedulerError;
use crate::core::types::{Level, RunStatus};
use crate::process::record::ProcessHandle;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Result of a starvation boost attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostOutcome {
    /// The process was waiting in a lower level and now waits at the top
    Requeued,
    /// The process was not queued; its next push lands at the top
    Promoted,
    /// The process finished or was already at the top level
    Skipped,
}

/// Effect of a finished burst on the quantum estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EstimateUpdate {
    /// The burst was folded in; the caller keeps the sample for retraction
    Folded(EstimateSample),
    /// A previously counted sample was removed
    Retracted,
    Unchanged,
}

impl EstimateUpdate {
    #[inline(always)]
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl ReadyQueue {
    /// Append a process at the tail of its current level and wake one waiting `pop`
    pub fn push(&self, process: ProcessHandle) -> Result<(), SchedulerError> {
        let level = loop {
            let level = process.level();
            let queue = self.level_queue(level)?;

            let mut entries = queue.lock();
            let mut state = process.lock();
            // A boost may have moved the record between the read and the lock
            if state.level != level {
                continue;
            }
            debug_assert!(!state.queued, "process {} queued twice", process.pid());

            entries
                .try_reserve(1)
                .map_err(|e| SchedulerError::QueueAllocation {
                    level,
                    reason: e.to_string(),
                })?;
            entries.push_back(Dispatch::Process(Arc::clone(&process)));
            state.queued = true;
            queue.inc();
            break level;
        };

        self.stats.inc_pushes();
        trace!(pid = process.pid(), level, "Process queued");
        self.notify_one();
        Ok(())
    }

    /// Queue a sentinel that makes exactly one worker terminate
    ///
    /// Sentinels go to the lowest level so ready work drains first.
    pub fn push_poison_pill(&self) -> Result<(), SchedulerError> {
        let level = self.lowest_level();
        let queue = &self.levels[level];
        {
            let mut entries = queue.lock();
            entries
                .try_reserve(1)
                .map_err(|e| SchedulerError::QueueAllocation {
                    level,
                    reason: e.to_string(),
                })?;
            entries.push_back(Dispatch::PoisonPill);
            queue.inc();
        }
        debug!("Poison pill queued");
        self.notify_one();
        Ok(())
    }

    /// Remove the head of the highest-priority non-empty level, blocking while empty
    pub fn pop(&self) -> Dispatch {
        loop {
            if let Some(dispatch) = self.try_pop() {
                return dispatch;
            }

            let mut signal = self.signal.lock();
            while self.size() == 0 {
                self.available.wait(&mut signal);
            }
        }
    }

    /// Non-blocking `pop`
    pub fn try_pop(&self) -> Option<Dispatch> {
        for (level, queue) in self.levels.iter().enumerate() {
            if queue.len_hint() == 0 {
                continue;
            }

            let mut entries = queue.lock();
            let Some(dispatch) = entries.pop_front() else {
                continue;
            };
            queue.dec();

            if let Dispatch::Process(ref process) = dispatch {
                let mut state = process.lock();
                debug_assert_eq!(state.level, level, "level bookkeeping out of sync");
                state.queued = false;
                drop(state);
                self.stats.inc_pops();
                trace!(pid = process.pid(), level, "Process dequeued");
            }
            return Some(dispatch);
        }
        None
    }

    /// Remove a waiting process from its current level
    ///
    /// Returns `false` when the process is not queued (running, blocked or done).
    pub fn remove(&self, process: &ProcessHandle) -> bool {
        loop {
            let level = process.level();
            let Ok(queue) = self.level_queue(level) else {
                return false;
            };

            let mut entries = queue.lock();
            if let Some(index) = position(&entries, process) {
                entries.remove(index);
                queue.dec();
                process.lock().queued = false;
                self.stats.inc_removals();
                return true;
            }

            // Absent only counts if the record did not move while we scanned
            if process.lock().level == level {
                return false;
            }
        }
    }

    /// Force a process back to the top level
    ///
    /// Clears `boost_pending` on every path.
    pub fn boost(&self, process: &ProcessHandle) -> Result<BoostOutcome, SchedulerError> {
        loop {
            let level = {
                let mut state = process.lock();
                if state.is_done() || state.level == 0 {
                    state.boost_pending = false;
                    return Ok(BoostOutcome::Skipped);
                }
                state.level
            };
            let queue = self.level_queue(level)?;

            let mut entries = queue.lock();
            if let Some(index) = position(&entries, process) {
                entries.remove(index);
                queue.dec();
                {
                    let mut state = process.lock();
                    state.queued = false;
                    state.level = 0;
                    state.boost_pending = false;
                }
                drop(entries);

                self.stats.inc_boosts();
                self.push(Arc::clone(process))?;
                return Ok(BoostOutcome::Requeued);
            }
            drop(entries);

            // Not in the level we scanned: held by a worker, in I/O, or just moved
            let mut state = process.lock();
            if state.level != level || state.queued {
                continue;
            }
            if !state.is_done() {
                state.level = 0;
            }
            state.boost_pending = false;
            self.stats.inc_boosts();
            return Ok(BoostOutcome::Promoted);
        }
    }

    /// Approximate number of queued items across all levels
    pub fn size(&self) -> usize {
        self.levels.iter().map(|queue| queue.len_hint()).sum()
    }

    /// Approximate number of queued items at one level
    pub fn level_len(&self, level: Level) -> usize {
        self.levels.get(level).map_or(0, |queue| queue.len_hint())
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Fold or retract a finished burst in the quantum estimate
    ///
    /// - `Blocked` and nothing counted yet: fold `observed`
    /// - `Done` with a counted sample: retract that sample with its original weight
    pub fn update_estimate(
        &self,
        status: RunStatus,
        observed: Duration,
        counted: Option<&EstimateSample>,
    ) -> EstimateUpdate {
        match (status, counted) {
            (RunStatus::Blocked, None) => {
                let sample = self.estimator.fold(observed);
                debug!(
                    ?observed,
                    weight = sample.weight,
                    estimate = ?self.estimator.estimate(),
                    "Burst folded into quantum estimate"
                );
                EstimateUpdate::Folded(sample)
            }
            (RunStatus::Done, Some(sample)) => {
                let estimate = self.estimator.retract(sample);
                debug!(burst = ?sample.burst, ?estimate, "Burst retracted from quantum estimate");
                EstimateUpdate::Retracted
            }
            _ => EstimateUpdate::Unchanged,
        }
    }

    /// Current burst estimate, `None` until the first blocked burst
    pub fn quantum_estimate(&self) -> Option<Duration> {
        self.estimator.estimate()
    }

    /// Number of samples folded into the estimate
    pub fn estimate_samples(&self) -> u64 {
        self.estimator.samples()
    }

    /// Quantum granted to a process at `level`
    pub fn quantum_for(&self, level: Level) -> Duration {
        if level == 0 {
            return self.config.top_quantum;
        }

        let multiplier = self
            .config
            .multiplier(level)
            .unwrap_or_else(|| self.config.max_multiplier());

        match self.estimator.estimate() {
            Some(estimate) => {
                let quantum = estimate.mul_f64(multiplier);
                if quantum.is_zero() {
                    self.config.default_quantum
                } else {
                    quantum
                }
            }
            None => self.config.default_quantum,
        }
    }

    fn level_queue(&self, level: Level) -> Result<&super::LevelQueue, SchedulerError> {
        self.levels.get(level).ok_or(SchedulerError::InvalidLevel {
            level,
            levels: self.levels.len(),
        })
    }

    fn notify_one(&self) {
        let _signal = self.signal.lock();
        self.available.notify_one();
    }
}

fn position(
    entries: &std::collections::VecDeque<Dispatch>,
    process: &ProcessHandle,
) -> Option<usize> {
    entries.iter().position(|dispatch| match dispatch {
        Dispatch::Process(candidate) => Arc::ptr_eq(candidate, process),
        Dispatch::PoisonPill => false,
    })
}
