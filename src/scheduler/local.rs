use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::orchestration::state::OrchestrationState;
use crate::orchestration::Orchestrator;
use crate::scheduler::driver::drive;
use crate::scheduler::{RetryPolicy, Scheduler};

/// In-process scheduler: one tokio task per orchestration key.
pub struct LocalScheduler {
    orchestrator: Arc<Orchestrator>,
    policy: RetryPolicy,
    in_flight: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
}

impl LocalScheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, policy: RetryPolicy) -> Self {
        Self {
            orchestrator,
            policy,
            in_flight: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Keys of orchestrations still running.
    pub async fn in_flight(&self) -> Vec<String> {
        let in_flight = self.in_flight.read().await;
        in_flight
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Abort every running orchestration and return their keys.
    pub async fn abort_all(&self) -> Vec<String> {
        let mut in_flight = self.in_flight.write().await;
        in_flight
            .drain()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(key, handle)| {
                handle.abort();
                key
            })
            .collect()
    }
}

#[async_trait]
impl Scheduler for LocalScheduler {
    async fn start(&self, state: OrchestrationState) -> Result<()> {
        let key = state.key();

        let mut in_flight = self.in_flight.write().await;
        in_flight.retain(|_, handle| !handle.is_finished());

        if in_flight.contains_key(&key) {
            tracing::info!(key = %key, "Orchestration already in flight, skipping");
            return Ok(());
        }

        tracing::info!(key = %key, "Starting orchestration");

        let orchestrator = Arc::clone(&self.orchestrator);
        let policy = self.policy.clone();
        let tracker = Arc::clone(&self.in_flight);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            match drive(&orchestrator, state, &policy).await {
                Ok(state) => {
                    tracing::info!(
                        key = %task_key,
                        reported = state.reported_jobs.len(),
                        "Orchestration completed"
                    );
                }
                Err(e) => {
                    tracing::error!(key = %task_key, error = %e, "Orchestration failed");
                }
            }
            tracker.write().await.remove(&task_key);
        });

        in_flight.insert(key, handle);
        Ok(())
    }
}
