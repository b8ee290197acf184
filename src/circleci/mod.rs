pub mod client;
pub mod legacy;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::{Build, BuildOutputLine, Job, Pipeline};

pub use client::CircleCiClient;
pub use legacy::LegacyBuildAdapter;

/// Current-generation CircleCI API: pipelines, workflows and jobs.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Most recent pipelines for a project, newest first.
    async fn list_project_pipelines(&self, owner: &str, repo: &str) -> Result<Vec<Pipeline>>;

    /// Fetch a pipeline with its workflow list populated.
    async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline>;

    /// All jobs of a workflow in declared order.
    async fn get_workflow_jobs(&self, workflow_id: &str) -> Result<Vec<Job>>;
}

/// Legacy CircleCI API: per-build steps, actions and raw output.
#[async_trait]
pub trait LegacyBuildApi: Send + Sync {
    async fn get_build(&self, owner: &str, repo: &str, build_num: u64) -> Result<Build>;

    /// Fetch an action's output stream. The URL is pre-signed; no token is sent.
    async fn get_action_output(&self, output_url: &str) -> Result<Vec<BuildOutputLine>>;
}
