pub mod driver;
pub mod local;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::orchestration::state::OrchestrationState;

pub use local::LocalScheduler;

/// Starts one orchestration per accepted pull-request event and owns its
/// retries and sleeps.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn start(&self, state: OrchestrationState) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub correlation_max_attempts: u32,
    pub correlation_interval: Duration,
    pub poll_max_retries: u32,
    pub backoff_unit: Duration,
}

impl From<&SchedulerConfig> for RetryPolicy {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            correlation_max_attempts: config.correlation_max_attempts.max(1),
            correlation_interval: Duration::from_secs(config.correlation_interval_secs),
            poll_max_retries: config.poll_max_retries.max(1),
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
        }
    }
}
