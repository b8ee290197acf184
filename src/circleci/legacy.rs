use std::sync::Arc;

use async_trait::async_trait;

use crate::circleci::LegacyBuildApi;
use crate::error::Result;
use crate::orchestration::evidence::{FailedAction, FailureEvidence, FailureEvidenceSource};
use crate::platform::types::RepoRef;

/// Builds failure evidence from the legacy build/step/action tree.
pub struct LegacyBuildAdapter {
    api: Arc<dyn LegacyBuildApi>,
}

impl LegacyBuildAdapter {
    pub fn new(api: Arc<dyn LegacyBuildApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl FailureEvidenceSource for LegacyBuildAdapter {
    async fn collect(&self, repo: &RepoRef, job_number: u64) -> Result<FailureEvidence> {
        let build = self.api.get_build(&repo.owner, &repo.name, job_number).await?;

        let mut failures = Vec::new();
        for step in &build.steps {
            for action in step.actions.iter().filter(|a| a.is_failed()) {
                let output = match action.output_url.as_deref() {
                    Some(url) => {
                        let lines = self.api.get_action_output(url).await?;
                        lines.into_iter().map(|line| line.message).collect()
                    }
                    None => {
                        tracing::debug!(
                            repo = %repo,
                            build = job_number,
                            step = %step.name,
                            "Failed action has no output"
                        );
                        String::new()
                    }
                };

                failures.push(FailedAction {
                    step_name: step.name.clone(),
                    action_index: action.index,
                    output,
                });
            }
        }

        tracing::debug!(
            repo = %repo,
            build = job_number,
            failed_actions = failures.len(),
            "Collected legacy build failure evidence"
        );

        Ok(FailureEvidence {
            job_number,
            failures,
        })
    }
}
