/*!
 * Simulation Driver
 *
 * Async event loop around the scheduler: arrival and I/O completion timers
 * submit processes, a periodic health check surfaces worker faults, and the
 * run ends once every process finished its last burst.
 */

use super::os::{IoRequest, SimulatedOs};
use super::report::Report;
use super::trace::Trace;
use crate::core::config::KernelConfig;
use crate::core::errors::{KernelError, SchedulerError};
use crate::core::types::KernelResult;
use crate::monitoring::RunSpan;
use crate::process::manager::Scheduler;
use crate::process::record::ProcessRecord;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};

/// How often the driver polls for worker faults
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// One simulation run of a trace under a configuration
pub struct Simulation {
    config: KernelConfig,
    trace: Trace,
}

impl Simulation {
    pub fn new(config: KernelConfig, trace: Trace) -> Self {
        Self { config, trace }
    }

    /// Run the workload to completion and report the timings
    pub async fn run(self) -> KernelResult<Report> {
        self.config.validate()?;

        let run = RunSpan::new(self.trace.len(), self.config.simulation.cores);
        let result = self.execute(&run).instrument(run.span().clone()).await;
        run.record_result(result.is_ok());
        result
    }

    async fn execute(self, run: &RunSpan) -> KernelResult<Report> {
        let Self { config, trace } = self;
        let cores = config.simulation.cores;

        let (io_tx, mut io_rx) = mpsc::unbounded_channel::<IoRequest>();
        let os = Arc::new(SimulatedOs::new(&trace, &config.simulation, io_tx));
        let scheduler = Arc::new(
            Scheduler::builder(os.clone(), os.clone())
                .with_config(config.scheduler.clone())
                .build()?,
        );

        let started = Instant::now();
        scheduler.start(cores)?;
        info!(processes = trace.len(), cores, "Simulation started");

        let mut timers: JoinSet<Result<(), SchedulerError>> = JoinSet::new();
        for spec in trace.processes() {
            let pid = spec.pid;
            let arrival = spec.arrival_after(config.simulation.time_unit);
            let os = Arc::clone(&os);
            let scheduler = Arc::clone(&scheduler);
            timers.spawn(async move {
                time::sleep(arrival).await;
                os.mark_ready(pid);
                debug!(pid, "Process arrived");
                scheduler.submit(ProcessRecord::shared(pid))
            });
        }

        let mut health = time::interval(HEALTH_CHECK_INTERVAL);
        health.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let outcome: KernelResult<()> = loop {
            if os.is_finished() {
                break Ok(());
            }

            tokio::select! {
                _ = os.all_done() => break Ok(()),

                Some(request) = io_rx.recv() => {
                    let os = Arc::clone(&os);
                    let scheduler = Arc::clone(&scheduler);
                    timers.spawn(async move {
                        time::sleep(request.delay).await;
                        let pid = request.process.pid();
                        os.mark_ready(pid);
                        debug!(pid, "I/O completed");
                        scheduler.submit(request.process)
                    });
                }

                Some(joined) = timers.join_next() => {
                    match joined {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => break Err(e.into()),
                        Err(e) => break Err(KernelError::Internal(format!("timer task failed: {}", e))),
                    }
                }

                _ = health.tick() => {
                    if let Some(fault) = scheduler.take_fault() {
                        break Err(fault.into());
                    }
                    debug!(
                        done = os.done(),
                        total = os.total(),
                        queued = scheduler.queue().size(),
                        "Simulation progress"
                    );
                }
            }
        };

        timers.abort_all();
        let elapsed = started.elapsed();

        if let Err(e) = &outcome {
            warn!(error = %e, "Simulation aborted, shutting scheduler down");
        }

        let stopping = Arc::clone(&scheduler);
        let shutdown = tokio::task::spawn_blocking(move || stopping.shutdown())
            .await
            .map_err(|e| KernelError::Internal(format!("shutdown task failed: {}", e)))?;

        outcome?;
        let shutdown = shutdown?;

        let report = Report::new(
            run.run_id(),
            cores,
            elapsed,
            &os.outcomes(),
            config.simulation.time_unit,
            os.context_switches(),
            shutdown,
        );
        info!(
            elapsed_ms = report.elapsed_ms,
            score = report.summary.score,
            context_switches = report.summary.context_switches,
            "Simulation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config(cores: usize) -> KernelConfig {
        let mut config = KernelConfig::default();
        config.simulation.cores = cores;
        config.simulation.context_switch = Duration::ZERO;
        config.simulation.time_unit = Duration::from_micros(100);
        config
    }

    #[tokio::test]
    async fn test_empty_trace_finishes_immediately() {
        let report = Simulation::new(fast_config(1), Trace::new(Vec::new()))
            .run()
            .await
            .unwrap();
        assert_eq!(report.summary.processes, 0);
        assert_eq!(report.workers.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_start() {
        let config = fast_config(0);
        let result = Simulation::new(config, Trace::new(Vec::new())).run().await;
        assert!(matches!(result, Err(KernelError::Config(_))));
    }

    #[tokio::test]
    async fn test_single_process_with_io() {
        let trace: Trace = "1\n1; 0; 3; 20; 300\n".parse().unwrap();
        let report = Simulation::new(fast_config(1), trace).run().await.unwrap();

        assert_eq!(report.summary.processes, 1);
        assert_eq!(report.scheduler.completed, 1);
        assert_eq!(report.scheduler.blocked, 2);
        let process = &report.processes[0];
        assert_eq!(process.bursts, 3);
        assert_eq!(report.summary.bursts, 3);
        // Each 2ms burst is timed from its own ready point; the 30ms I/O waits
        // between bursts are not part of any burst's turnaround
        assert!(process.turnaround_ms >= 2.0);
        assert!(process.turnaround_ms < 30.0);
        assert!(process.response_ms <= process.turnaround_ms);
    }
}
