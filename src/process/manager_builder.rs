/*!
 * Scheduler Builder
 * Builder pattern for Scheduler construction
 */

use super::manager::Scheduler;
use super::traits::{Executor, IoStarter};
use crate::core::config::SchedulerConfig;
use crate::core::errors::ConfigError;
use std::sync::Arc;
use tracing::info;

/// Builder for Scheduler
pub struct SchedulerBuilder {
    executor: Arc<dyn Executor>,
    io: Arc<dyn IoStarter>,
    config: Option<SchedulerConfig>,
}

impl SchedulerBuilder {
    /// Create a builder around the machine primitives
    pub fn new(executor: Arc<dyn Executor>, io: Arc<dyn IoStarter>) -> Self {
        Self {
            executor,
            io,
            config: None,
        }
    }

    /// Use explicit scheduling parameters instead of the defaults
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate the configuration and build the Scheduler
    pub fn build(self) -> Result<Scheduler, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        info!(
            levels = config.levels,
            multipliers = ?config.multipliers,
            micro_quantum_max = ?config.micro_quantum_max,
            boost_interval = ?config.boost_interval,
            "Scheduler configured"
        );

        Ok(Scheduler::from_parts(&config, self.executor, self.io))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CoreId, Pid, RunStatus};
    use crate::process::record::ProcessHandle;
    use std::time::Duration;

    struct Idle;

    impl Executor for Idle {
        fn run(&self, _pid: Pid, _core: CoreId, _slice: Duration) -> RunStatus {
            RunStatus::Preempted
        }
    }

    impl IoStarter for Idle {
        fn start_io(&self, _process: ProcessHandle) {}
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let idle = Arc::new(Idle);
        let config = SchedulerConfig {
            levels: 0,
            ..SchedulerConfig::default()
        };
        let result = SchedulerBuilder::new(idle.clone(), idle).with_config(config).build();
        assert!(matches!(result, Err(ConfigError::NoLevels)));
    }

    #[test]
    fn test_build_uses_config_levels() {
        let idle = Arc::new(Idle);
        let config = SchedulerConfig {
            levels: 2,
            multipliers: vec![1.5],
            ..SchedulerConfig::default()
        };
        let scheduler = SchedulerBuilder::new(idle.clone(), idle)
            .with_config(config)
            .build()
            .unwrap();
        assert_eq!(scheduler.queue().levels(), 2);
    }
}
