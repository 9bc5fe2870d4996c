/*!
 * Workload Trace
 *
 * Format:
 * ```text
 * 3
 * 0; 0; 2; 50; 20
 * 1; 5; 1; 300; 0
 * 2; 5; 4; 10; 40
 * ```
 * The first line holds the process count; each following line is
 * `pid; arrival; burst_count; burst_time; io_time` in trace time units.
 * Blank lines and `#` comments are ignored.
 */

use crate::core::errors::TraceError;
use crate::core::types::Pid;
use ahash::HashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// One process of a workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub pid: Pid,
    /// Arrival time in trace units
    pub arrival: u64,
    /// Number of identical CPU bursts
    pub burst_count: u32,
    /// Length of each CPU burst in trace units
    pub burst_time: u64,
    /// I/O wait between consecutive bursts in trace units
    pub io_time: u64,
}

impl ProcessSpec {
    pub fn arrival_after(&self, unit: Duration) -> Duration {
        scale(unit, self.arrival)
    }

    pub fn burst_duration(&self, unit: Duration) -> Duration {
        scale(unit, self.burst_time)
    }

    pub fn io_duration(&self, unit: Duration) -> Duration {
        scale(unit, self.io_time)
    }
}

fn scale(unit: Duration, units: u64) -> Duration {
    unit.saturating_mul(u32::try_from(units).unwrap_or(u32::MAX))
}

/// A parsed workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    processes: Vec<ProcessSpec>,
}

impl Trace {
    pub fn new(processes: Vec<ProcessSpec>) -> Self {
        Self { processes }
    }

    /// Read and parse a trace file
    pub fn from_file(path: &Path) -> Result<Self, TraceError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TraceError::Io(format!("{}: {}", path.display(), e)))?;
        let trace: Self = text.parse()?;
        info!(path = %path.display(), processes = trace.len(), "Loaded trace");
        Ok(trace)
    }

    pub fn processes(&self) -> &[ProcessSpec] {
        &self.processes
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

impl FromStr for Trace {
    type Err = TraceError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (header_line, header) = lines.next().ok_or(TraceError::Empty)?;
        let declared: usize = header.parse().map_err(|_| TraceError::InvalidHeader {
            line: header_line,
            value: header.to_string(),
        })?;

        let mut processes = Vec::with_capacity(declared);
        let mut seen = HashSet::default();
        for (line, content) in lines {
            let spec = parse_line(line, content)?;
            if !seen.insert(spec.pid) {
                return Err(TraceError::DuplicatePid {
                    line,
                    pid: spec.pid,
                });
            }
            if spec.burst_count == 0 {
                return Err(TraceError::ZeroBursts {
                    line,
                    pid: spec.pid,
                });
            }
            processes.push(spec);
        }

        if processes.len() != declared {
            return Err(TraceError::CountMismatch {
                declared,
                found: processes.len(),
            });
        }

        Ok(Self { processes })
    }
}

fn parse_line(line: usize, content: &str) -> Result<ProcessSpec, TraceError> {
    let fields: Vec<&str> = content.split(';').map(str::trim).collect();
    if fields.len() != 5 {
        return Err(TraceError::MalformedLine {
            line,
            reason: format!("expected 5 fields, found {}", fields.len()),
        });
    }

    fn field<T: FromStr>(line: usize, name: &str, value: &str) -> Result<T, TraceError> {
        value.parse().map_err(|_| TraceError::MalformedLine {
            line,
            reason: format!("invalid {} '{}'", name, value),
        })
    }

    Ok(ProcessSpec {
        pid: field(line, "pid", fields[0])?,
        arrival: field(line, "arrival", fields[1])?,
        burst_count: field(line, "burst_count", fields[2])?,
        burst_time: field(line, "burst_time", fields[3])?,
        io_time: field(line, "io_time", fields[4])?,
    })
}
