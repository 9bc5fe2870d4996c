/*!
 * Simulation Report
 * Per-process timings, summary averages and scheduler statistics
 */

use super::os::ProcessOutcome;
use crate::core::types::Pid;
use crate::process::manager::ShutdownReport;
use crate::process::scheduler::SchedulerStats;
use crate::process::worker::WorkerSummary;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Per-burst averages of one process in milliseconds
///
/// Every burst is timed from the moment the process became ready (arrival or
/// I/O completion) to its first run and to its completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessReport {
    pub pid: Pid,
    pub bursts: u32,
    pub burst_ms: f64,
    pub turnaround_ms: f64,
    pub wait_ms: f64,
    pub response_ms: f64,
    pub max_response_ms: f64,
}

/// Averages over every burst of every process
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub processes: usize,
    pub bursts: u64,
    pub avg_burst_ms: f64,
    pub avg_turnaround_ms: f64,
    pub avg_wait_ms: f64,
    pub avg_response_ms: f64,
    pub max_response_ms: f64,
    pub context_switches: u64,
    /// (avg wait + 2 * avg response) / avg burst; lower is better
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run_id: Uuid,
    pub cores: usize,
    pub elapsed_ms: f64,
    pub processes: Vec<ProcessReport>,
    pub summary: Summary,
    pub scheduler: SchedulerStats,
    pub workers: Vec<WorkerSummary>,
}

fn millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

impl ProcessReport {
    /// Derive per-burst averages; None unless every burst completed
    pub fn from_outcome(outcome: &ProcessOutcome, time_unit: Duration) -> Option<Self> {
        if outcome.bursts.is_empty() {
            return None;
        }
        let cpu = outcome.spec.burst_duration(time_unit);

        let mut turnaround = Duration::ZERO;
        let mut wait = Duration::ZERO;
        let mut response = Duration::ZERO;
        let mut max_response = Duration::ZERO;
        for timing in &outcome.bursts {
            let ready = timing.ready?;
            let first_run = timing.first_run?;
            let completed = timing.completed?;

            let burst_turnaround = completed.saturating_sub(ready);
            let burst_response = first_run.saturating_sub(ready);
            turnaround += burst_turnaround;
            wait += burst_turnaround.saturating_sub(cpu);
            response += burst_response;
            max_response = max_response.max(burst_response);
        }

        let count = outcome.bursts.len() as f64;
        Some(Self {
            pid: outcome.spec.pid,
            bursts: outcome.bursts.len() as u32,
            burst_ms: millis(cpu),
            turnaround_ms: millis(turnaround) / count,
            wait_ms: millis(wait) / count,
            response_ms: millis(response) / count,
            max_response_ms: millis(max_response),
        })
    }
}

impl Summary {
    pub fn from_processes(processes: &[ProcessReport], context_switches: u64) -> Self {
        let bursts: u64 = processes.iter().map(|p| u64::from(p.bursts)).sum();
        // Processes weigh by their burst count, so this is a mean over bursts
        let per_burst = |value: fn(&ProcessReport) -> f64| {
            if bursts == 0 {
                return 0.0;
            }
            let total: f64 = processes
                .iter()
                .map(|p| value(p) * f64::from(p.bursts))
                .sum();
            total / bursts as f64
        };

        let avg_burst_ms = per_burst(|p| p.burst_ms);
        let avg_wait_ms = per_burst(|p| p.wait_ms);
        let avg_response_ms = per_burst(|p| p.response_ms);
        let score = if avg_burst_ms > 0.0 {
            (avg_wait_ms + 2.0 * avg_response_ms) / avg_burst_ms
        } else {
            0.0
        };

        Self {
            processes: processes.len(),
            bursts,
            avg_burst_ms,
            avg_turnaround_ms: per_burst(|p| p.turnaround_ms),
            avg_wait_ms,
            avg_response_ms,
            max_response_ms: processes
                .iter()
                .map(|p| p.max_response_ms)
                .fold(0.0, f64::max),
            context_switches,
            score,
        }
    }
}

impl Report {
    pub fn new(
        run_id: Uuid,
        cores: usize,
        elapsed: Duration,
        outcomes: &[ProcessOutcome],
        time_unit: Duration,
        context_switches: u64,
        shutdown: ShutdownReport,
    ) -> Self {
        let processes: Vec<ProcessReport> = outcomes
            .iter()
            .filter_map(|outcome| ProcessReport::from_outcome(outcome, time_unit))
            .collect();
        let summary = Summary::from_processes(&processes, context_switches);

        Self {
            run_id,
            cores,
            elapsed_ms: millis(elapsed),
            processes,
            summary,
            scheduler: shutdown.stats,
            workers: shutdown.workers,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run {} ({} processes, {} bursts, {} cores, {:.1} ms)",
            self.run_id, self.summary.processes, self.summary.bursts, self.cores, self.elapsed_ms
        )?;
        writeln!(
            f,
            "{:>6} {:>7} {:>10} {:>12} {:>10} {:>10} {:>10}",
            "PID", "BURSTS", "BURST", "TURNAROUND", "WAIT", "RESPONSE", "MAX RESP"
        )?;
        for p in &self.processes {
            writeln!(
                f,
                "{:>6} {:>7} {:>10.1} {:>12.1} {:>10.1} {:>10.1} {:>10.1}",
                p.pid,
                p.bursts,
                p.burst_ms,
                p.turnaround_ms,
                p.wait_ms,
                p.response_ms,
                p.max_response_ms
            )?;
        }

        let s = &self.summary;
        writeln!(f)?;
        writeln!(f, "Average burst:      {:.2} ms", s.avg_burst_ms)?;
        writeln!(f, "Average turnaround: {:.2} ms", s.avg_turnaround_ms)?;
        writeln!(f, "Average wait:       {:.2} ms", s.avg_wait_ms)?;
        writeln!(f, "Average response:   {:.2} ms", s.avg_response_ms)?;
        writeln!(f, "Max response:       {:.2} ms", s.max_response_ms)?;
        writeln!(f, "Context switches:   {}", s.context_switches)?;
        writeln!(
            f,
            "Preemptions:        {} ({} micro), boosts: {}",
            self.scheduler.preemptions, self.scheduler.micro_preemptions, self.scheduler.boosts
        )?;
        write!(f, "Score:              {:.3}", s.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::os::BurstTiming;
    use crate::simulation::trace::ProcessSpec;

    /// Process with 10ms bursts; each burst is (ready, first run, completed) in ms
    fn outcome(pid: Pid, bursts: &[(u64, u64, u64)]) -> ProcessOutcome {
        ProcessOutcome {
            spec: ProcessSpec {
                pid,
                arrival: bursts.first().map_or(0, |b| b.0),
                burst_count: bursts.len() as u32,
                burst_time: 10,
                io_time: 5,
            },
            bursts: bursts
                .iter()
                .map(|&(ready, first_run, completed)| BurstTiming {
                    ready: Some(Duration::from_millis(ready)),
                    first_run: Some(Duration::from_millis(first_run)),
                    completed: Some(Duration::from_millis(completed)),
                })
                .collect(),
        }
    }

    #[test]
    fn test_process_report_averages_bursts() {
        let unit = Duration::from_millis(1);
        let report = ProcessReport::from_outcome(&outcome(1, &[(0, 4, 40), (50, 52, 62)]), unit)
            .unwrap();

        assert_eq!(report.bursts, 2);
        assert_eq!(report.burst_ms, 10.0);
        // (40 + 12) / 2
        assert_eq!(report.turnaround_ms, 26.0);
        // (30 + 2) / 2
        assert_eq!(report.wait_ms, 16.0);
        // Response after the I/O return counts as much as the first one
        assert_eq!(report.response_ms, 3.0);
        assert_eq!(report.max_response_ms, 4.0);
    }

    #[test]
    fn test_unfinished_process_is_skipped() {
        let mut unfinished = outcome(2, &[(0, 1, 11), (20, 21, 31)]);
        unfinished.bursts[1].completed = None;
        assert!(ProcessReport::from_outcome(&unfinished, Duration::from_millis(1)).is_none());
    }

    #[test]
    fn test_summary_is_a_mean_over_bursts() {
        let unit = Duration::from_millis(1);
        let processes: Vec<ProcessReport> = [
            outcome(1, &[(0, 4, 40), (50, 52, 62)]),
            outcome(2, &[(0, 9, 50)]),
        ]
        .iter()
        .filter_map(|o| ProcessReport::from_outcome(o, unit))
        .collect();
        let summary = Summary::from_processes(&processes, 7);

        assert_eq!(summary.processes, 2);
        assert_eq!(summary.bursts, 3);
        assert_eq!(summary.avg_burst_ms, 10.0);
        // (40 + 12 + 50) / 3
        assert_eq!(summary.avg_turnaround_ms, 34.0);
        // (30 + 2 + 40) / 3
        assert_eq!(summary.avg_wait_ms, 24.0);
        // (4 + 2 + 9) / 3
        assert_eq!(summary.avg_response_ms, 5.0);
        assert_eq!(summary.max_response_ms, 9.0);
        assert_eq!(summary.context_switches, 7);
        assert_eq!(summary.score, 3.4);
    }

    #[test]
    fn test_empty_summary() {
        let summary = Summary::from_processes(&[], 0);
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn test_report_display_and_json() {
        let shutdown = ShutdownReport {
            workers: vec![WorkerSummary {
                core: 0,
                dispatched: 3,
            }],
            monitors_joined: 0,
            stats: SchedulerStats::default(),
        };
        let report = Report::new(
            Uuid::new_v4(),
            1,
            Duration::from_millis(60),
            &[outcome(1, &[(0, 4, 40)])],
            Duration::from_millis(1),
            2,
            shutdown,
        );

        let text = report.to_string();
        assert!(text.contains("Score:"));
        assert!(text.contains("Context switches:   2"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["summary"]["processes"], 1);
        assert_eq!(json["summary"]["bursts"], 1);
        assert_eq!(json["processes"][0]["max_response_ms"], 4.0);
        assert_eq!(json["workers"][0]["dispatched"], 3);
    }
}
