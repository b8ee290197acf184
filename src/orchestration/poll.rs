use crate::circleci::types::{Job, JobStatus};
use crate::circleci::PipelineApi;
use crate::error::{AppError, Result};
use crate::orchestration::report::FailureReporter;
use crate::orchestration::state::{OrchestrationState, PollPhase};

/// One invocation of the job poller.
///
/// Returns `Pending` when the scheduler must wait `wait_for_jobs_wait_time`
/// units and call again, or `Complete` once every job is terminal and every
/// failed job has been reported. A `Complete` record must not be re-invoked.
pub async fn wait_for_jobs(
    api: &dyn PipelineApi,
    reporter: &dyn FailureReporter,
    state: &mut OrchestrationState,
) -> Result<PollPhase> {
    if state.all_jobs_done {
        tracing::warn!(key = %state.key(), "Poller invoked on a completed orchestration");
        return Ok(PollPhase::Complete);
    }
    if !state.has_pipeline() {
        return Err(AppError::Internal(format!(
            "Poller invoked before a pipeline was found for {}",
            state.key()
        )));
    }

    state.advance_backoff();

    tracing::info!(
        key = %state.key(),
        pipeline_id = %state.pipeline_id,
        phase = ?state.phase(),
        retry = state.wait_for_jobs_retry_count,
        wait = state.wait_for_jobs_wait_time,
        "Polling jobs"
    );

    if state.phase() == PollPhase::ResolvingWorkflows {
        let pipeline = api.get_pipeline(&state.pipeline_id).await.map_err(|e| {
            AppError::upstream(format!("fetching pipeline {}", state.pipeline_id), e)
        })?;

        let workflow_ids = pipeline.workflow_ids();
        if workflow_ids.is_empty() {
            tracing::info!(
                pipeline_id = %state.pipeline_id,
                pipeline_state = %pipeline.state,
                "Pipeline has no workflows yet"
            );
            state.all_jobs_done = false;
            return Ok(PollPhase::Pending);
        }
        state.workflow_ids = workflow_ids;
    }

    // First pass: stop at the first workflow with a job still in flight.
    for workflow_id in state.workflow_ids.clone() {
        let jobs = fetch_jobs(api, &workflow_id).await?;
        let in_flight = jobs.iter().find(|job| !job.status.is_terminal()).cloned();
        state.workflow_jobs.insert(workflow_id.clone(), jobs);

        if let Some(job) = in_flight {
            tracing::info!(
                workflow_id = %workflow_id,
                job = %job.name,
                status = %job.status,
                "Job not finished yet"
            );
            state.all_jobs_done = false;
            return Ok(PollPhase::Pending);
        }
    }

    // Second pass: re-fetch so reporting never acts on the completion-check snapshot.
    for workflow_id in state.workflow_ids.clone() {
        let jobs = fetch_jobs(api, &workflow_id).await?;

        for job in jobs.iter().filter(|job| job.status == JobStatus::Failed) {
            if state.is_reported(&job.id) {
                tracing::debug!(job = %job.label(), "Failure already reported");
                continue;
            }

            tracing::info!(
                workflow_id = %workflow_id,
                job = %job.label(),
                "Reporting failed job"
            );
            reporter.report_failed_job(state, job).await?;
            state.reported_jobs.push(job.id.clone());
        }

        state.workflow_jobs.insert(workflow_id, jobs);
    }

    state.all_jobs_done = true;
    tracing::info!(
        key = %state.key(),
        reported = state.reported_jobs.len(),
        "All jobs done"
    );

    Ok(PollPhase::Complete)
}

async fn fetch_jobs(api: &dyn PipelineApi, workflow_id: &str) -> Result<Vec<Job>> {
    api.get_workflow_jobs(workflow_id)
        .await
        .map_err(|e| AppError::upstream(format!("fetching jobs for workflow {workflow_id}"), e))
}
