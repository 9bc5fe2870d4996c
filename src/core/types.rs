/*!
 * Core Types
 * Common types used across the scheduler and the simulation
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process ID type
pub type Pid = u32;

/// Simulated core index
pub type CoreId = usize;

/// Priority level (0 is the highest, levels - 1 the lowest)
pub type Level = usize;

/// Common result type for kernel operations
pub type KernelResult<T> = Result<T, super::errors::KernelError>;

/// Outcome reported by the execution primitive for one time slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The process finished its last burst
    Done,
    /// The burst completed and the process waits for I/O
    Blocked,
    /// The time slice expired before the burst completed
    Preempted,
}

impl RunStatus {
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Blocked => "blocked",
            Self::Preempted => "preempted",
        }
    }

    /// Whether the current burst ended with this status
    #[inline(always)]
    pub const fn ends_burst(&self) -> bool {
        matches!(self, Self::Done | Self::Blocked)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ends_burst() {
        assert!(RunStatus::Done.ends_burst());
        assert!(RunStatus::Blocked.ends_burst());
        assert!(!RunStatus::Preempted.ends_burst());
    }

    #[test]
    fn test_status_serde_names() {
        let json = serde_json::to_string(&RunStatus::Blocked).unwrap();
        assert_eq!(json, "\"blocked\"");
    }
}
