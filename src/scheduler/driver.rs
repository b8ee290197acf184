use crate::error::{AppError, Result};
use crate::orchestration::state::{OrchestrationState, PollPhase};
use crate::orchestration::Orchestrator;
use crate::scheduler::RetryPolicy;

/// Run one orchestration to completion: correlate, then poll with backoff.
pub async fn drive(
    orchestrator: &Orchestrator,
    mut state: OrchestrationState,
    policy: &RetryPolicy,
) -> Result<OrchestrationState> {
    if !state.has_pipeline() {
        correlate(orchestrator, &mut state, policy).await?;
    }
    poll(orchestrator, &mut state, policy).await?;
    Ok(state)
}

async fn correlate(
    orchestrator: &Orchestrator,
    state: &mut OrchestrationState,
    policy: &RetryPolicy,
) -> Result<()> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match orchestrator.find_pipeline(state).await {
            Ok(_) => return Ok(()),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= policy.correlation_max_attempts => {
                tracing::error!(key = %state.key(), attempts = attempt, error = %e, "Giving up on pipeline lookup");
                return Err(AppError::RetriesExhausted {
                    step: "find_pipeline",
                    attempts: attempt,
                });
            }
            Err(e) => {
                tracing::info!(
                    key = %state.key(),
                    attempt,
                    error = %e,
                    "Pipeline lookup will be retried"
                );
                tokio::time::sleep(policy.correlation_interval).await;
            }
        }
    }
}

async fn poll(
    orchestrator: &Orchestrator,
    state: &mut OrchestrationState,
    policy: &RetryPolicy,
) -> Result<()> {
    loop {
        match orchestrator.wait_for_jobs(state).await {
            Ok(PollPhase::Complete) => return Ok(()),
            Ok(_) => {}
            Err(e) if e.is_retryable() => {
                tracing::warn!(key = %state.key(), error = %e, "Poll failed, will retry");
            }
            Err(e) => return Err(e),
        }

        if state.wait_for_jobs_retry_count >= policy.poll_max_retries {
            tracing::error!(
                key = %state.key(),
                retries = state.wait_for_jobs_retry_count,
                "Jobs did not finish in time"
            );
            return Err(AppError::RetriesExhausted {
                step: "wait_for_jobs",
                attempts: state.wait_for_jobs_retry_count,
            });
        }

        let wait = state.wait_duration(policy.backoff_unit);
        tracing::debug!(key = %state.key(), wait_ms = wait.as_millis() as u64, "Sleeping before next poll");
        tokio::time::sleep(wait).await;
    }
}
