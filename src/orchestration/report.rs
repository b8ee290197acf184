use std::sync::Arc;

use async_trait::async_trait;

use crate::circleci::types::Job;
use crate::error::{AppError, Result};
use crate::orchestration::evidence::{FailureEvidence, FailureEvidenceSource};
use crate::orchestration::state::OrchestrationState;
use crate::platform::Platform;

const REPORT_HEADER: &str = "Build Failed :cry: \n";
const FENCE: &str = "```";
const NO_OUTPUT: &str = "(no output was captured for the failed steps)";

/// Publishes one report per failed job.
#[async_trait]
pub trait FailureReporter: Send + Sync {
    async fn report_failed_job(&self, state: &OrchestrationState, job: &Job) -> Result<()>;
}

/// Collects failure evidence and posts it as a pull-request comment.
pub struct CommentReporter {
    evidence: Arc<dyn FailureEvidenceSource>,
    platform: Arc<dyn Platform>,
    max_comment_chars: usize,
}

impl CommentReporter {
    pub fn new(
        evidence: Arc<dyn FailureEvidenceSource>,
        platform: Arc<dyn Platform>,
        max_comment_chars: usize,
    ) -> Self {
        Self {
            evidence,
            platform,
            max_comment_chars,
        }
    }
}

#[async_trait]
impl FailureReporter for CommentReporter {
    async fn report_failed_job(&self, state: &OrchestrationState, job: &Job) -> Result<()> {
        let job_number = job.job_number.ok_or_else(|| {
            AppError::reporting(
                job.label(),
                AppError::Internal("failed job has no build number".to_string()),
            )
        })?;
        let repo = state.repo();

        let evidence = self
            .evidence
            .collect(&repo, job_number)
            .await
            .map_err(|e| AppError::reporting(job.label(), e))?;

        let body = render_report(&evidence, self.max_comment_chars);

        self.platform
            .post_comment(state.installation_id, &repo, state.pull_request_number, &body)
            .await
            .map_err(|e| AppError::reporting(job.label(), e))?;

        tracing::info!(
            repo = %repo,
            pr = state.pull_request_number,
            job = %job.label(),
            failed_actions = evidence.failures.len(),
            "Posted build failure comment"
        );

        Ok(())
    }
}

/// Render the fixed report template.
///
/// When the output would push the body past `max_chars`, only the tail of the
/// output is kept, behind a truncation marker when it fits. The header and
/// fences are never cut.
pub fn render_report(evidence: &FailureEvidence, max_chars: usize) -> String {
    let output = if evidence.is_empty() {
        NO_OUTPUT.to_string()
    } else {
        evidence.combined_output()
    };

    let overhead = REPORT_HEADER.len() + 2 * FENCE.len() + 2;
    let budget = max_chars.saturating_sub(overhead);
    let output = truncate_head(&output, budget);

    format!("{REPORT_HEADER}{FENCE}\n{output}\n{FENCE}")
}

fn truncate_head(output: &str, budget: usize) -> String {
    let total = output.chars().count();
    if total <= budget {
        return output.to_string();
    }

    let marker = format!("... output truncated, showing the last {budget} characters ...\n");
    let marker_len = marker.chars().count();
    if marker_len >= budget {
        // No room for the marker; keep only the tail.
        return output.chars().skip(total - budget).collect();
    }

    let keep = budget - marker_len;
    let tail: String = output.chars().skip(total - keep).collect();
    format!("{marker}{tail}")
}
