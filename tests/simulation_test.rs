/*!
 * Simulation Tests
 * End-to-end runs of trace files through the scheduler
 */

use mlfq_kernel::{KernelConfig, KernelError, Simulation, Trace, TraceError};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn fast_config(cores: usize) -> KernelConfig {
    let mut config = KernelConfig::default();
    config.simulation.cores = cores;
    config.simulation.context_switch = Duration::from_micros(200);
    config.simulation.time_unit = Duration::from_micros(100);
    config
}

const MIXED_TRACE: &str = "\
# interactive shells and two batch jobs
4
0; 0; 5; 10; 30
1; 0; 1; 1500; 0
2; 20; 4; 15; 20
3; 50; 1; 800; 0
";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mixed_workload_completes() {
    let file = write_temp(MIXED_TRACE);
    let trace = Trace::from_file(file.path()).unwrap();

    let report = Simulation::new(fast_config(2), trace).run().await.unwrap();

    assert_eq!(report.summary.processes, 4);
    assert_eq!(report.scheduler.completed, 4);
    assert_eq!(report.scheduler.blocked, 4 + 3);
    assert_eq!(
        report.processes.iter().map(|p| p.pid).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    for process in &report.processes {
        assert!(process.response_ms <= process.turnaround_ms);
    }
    assert!(report.summary.context_switches >= 4);
    assert!(report.summary.score >= 0.0);
    assert_eq!(report.workers.len(), 2);
    assert_eq!(report.scheduler.queued, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_job_is_demoted() {
    let trace: Trace = "1\n9; 0; 1; 500; 0\n".parse().unwrap();
    let report = Simulation::new(fast_config(1), trace).run().await.unwrap();

    // 50ms of CPU against a 10ms top quantum
    assert!(report.scheduler.demotions >= 1);
    assert!(report.scheduler.preemptions >= 1);
    assert!(report.processes[0].turnaround_ms >= 50.0);
}

#[tokio::test]
async fn test_config_file_drives_run() {
    let config_file = write_temp(
        r#"{
            "scheduler": { "levels": 2, "multipliers": [1.5], "top_quantum_ms": 2 },
            "simulation": { "cores": 1, "context_switch_ms": 0, "time_unit_us": 100 }
        }"#,
    );
    let config = KernelConfig::from_file(config_file.path()).unwrap();
    let trace: Trace = "2\n1; 0; 2; 30; 10\n2; 0; 1; 40; 0\n".parse().unwrap();

    let report = Simulation::new(config, trace).run().await.unwrap();
    assert_eq!(report.summary.processes, 2);
    assert_eq!(report.cores, 1);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["summary"]["processes"], 2);
    assert_eq!(json["run_id"].as_str().map(str::len), Some(36));
}

#[test]
fn test_malformed_trace_file_is_rejected() {
    let file = write_temp("2\n0; 0; 1; 10; 0\n");
    let err = Trace::from_file(file.path()).unwrap_err();
    assert_eq!(
        err,
        TraceError::CountMismatch {
            declared: 2,
            found: 1
        }
    );

    let wrapped: KernelError = err.into();
    assert!(matches!(wrapped, KernelError::Trace(_)));
}
