use crate::circleci::types::Pipeline;
use crate::circleci::PipelineApi;
use crate::error::{AppError, Result};
use crate::orchestration::state::OrchestrationState;

/// Find the pipeline triggered by the record's head commit and store its id.
///
/// A miss is `PipelineNotFound`, which is expected right after the webhook
/// fires; the scheduler re-invokes later. The record is left untouched on a miss.
pub async fn find_pipeline(
    api: &dyn PipelineApi,
    state: &mut OrchestrationState,
) -> Result<String> {
    let pipelines = api
        .list_project_pipelines(&state.owner, &state.repo_name)
        .await
        .map_err(|e| {
            AppError::upstream(
                format!("listing pipelines for {}/{}", state.owner, state.repo_name),
                e,
            )
        })?;

    match match_pipeline(&pipelines, &state.commit_sha) {
        Some(pipeline) => {
            tracing::info!(
                repo = %state.repo(),
                commit = %state.commit_sha,
                pipeline_id = %pipeline.id,
                pipeline_number = pipeline.number,
                "Found pipeline for commit"
            );
            state.pipeline_id = pipeline.id.clone();
            Ok(pipeline.id.clone())
        }
        None => {
            tracing::debug!(
                repo = %state.repo(),
                commit = %state.commit_sha,
                scanned = pipelines.len(),
                "No pipeline for commit yet"
            );
            Err(AppError::PipelineNotFound {
                commit_sha: state.commit_sha.clone(),
            })
        }
    }
}

/// First pipeline whose trigger revision equals `commit_sha` exactly.
pub fn match_pipeline<'a>(pipelines: &'a [Pipeline], commit_sha: &str) -> Option<&'a Pipeline> {
    if commit_sha.is_empty() {
        return None;
    }
    pipelines
        .iter()
        .find(|pipeline| pipeline.revision() == Some(commit_sha))
}
