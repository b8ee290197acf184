pub mod correlate;
pub mod evidence;
pub mod poll;
pub mod presence;
pub mod report;
pub mod state;

use std::sync::Arc;

use crate::circleci::{CircleCiClient, LegacyBuildAdapter, PipelineApi};
use crate::config::AppConfig;
use crate::error::Result;
use crate::platform::Platform;

use report::{CommentReporter, FailureReporter};
use state::{OrchestrationState, PollPhase};

/// The two re-entrant steps the scheduler drives.
pub struct Orchestrator {
    pipelines: Arc<dyn PipelineApi>,
    reporter: Arc<dyn FailureReporter>,
}

impl Orchestrator {
    pub fn new(pipelines: Arc<dyn PipelineApi>, reporter: Arc<dyn FailureReporter>) -> Self {
        Self {
            pipelines,
            reporter,
        }
    }

    /// Wire the CircleCI client and comment reporter from configuration.
    pub fn from_config(config: &AppConfig, platform: Arc<dyn Platform>) -> Result<Self> {
        let client = Arc::new(CircleCiClient::new(&config.circleci)?);
        let evidence = Arc::new(LegacyBuildAdapter::new(client.clone()));
        let reporter = Arc::new(CommentReporter::new(
            evidence,
            platform,
            config.report.max_comment_chars,
        ));
        Ok(Self::new(client, reporter))
    }

    pub async fn find_pipeline(&self, state: &mut OrchestrationState) -> Result<String> {
        correlate::find_pipeline(self.pipelines.as_ref(), state).await
    }

    pub async fn wait_for_jobs(&self, state: &mut OrchestrationState) -> Result<PollPhase> {
        poll::wait_for_jobs(self.pipelines.as_ref(), self.reporter.as_ref(), state).await
    }
}
