use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::circleci::types::Job;
use crate::platform::types::RepoRef;
use crate::webhook::events::PullRequestEvent;

/// The record threaded through every step and carried by the scheduler
/// between invocations. Field names are the wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationState {
    pub repo_name: String,
    pub owner: String,
    pub pull_request_number: u64,
    pub installation_id: u64,
    pub commit_sha: String,
    /// Empty until correlation succeeds.
    #[serde(default)]
    pub pipeline_id: String,
    #[serde(default)]
    pub workflow_ids: Vec<String>,
    /// Latest job snapshot per workflow, replaced wholesale on each fetch.
    #[serde(default)]
    pub workflow_jobs: BTreeMap<String, Vec<Job>>,
    #[serde(default)]
    pub all_jobs_done: bool,
    #[serde(default)]
    pub wait_for_jobs_retry_count: u32,
    /// In backoff units (seconds by default).
    #[serde(default)]
    pub wait_for_jobs_wait_time: u64,
    /// Ids of failed jobs that already have a comment.
    #[serde(default)]
    pub reported_jobs: Vec<String>,
}

/// Where the job poller stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Pipeline known, workflow list still empty.
    ResolvingWorkflows,
    /// Workflow list known, jobs being refreshed.
    PollingJobs,
    /// Some job is not terminal; wait and re-invoke.
    Pending,
    /// Every job is terminal and failures have been reported.
    Complete,
}

impl From<&PullRequestEvent> for OrchestrationState {
    fn from(event: &PullRequestEvent) -> Self {
        Self {
            repo_name: event.repo.name.clone(),
            owner: event.repo.owner.clone(),
            pull_request_number: event.number,
            installation_id: event.installation_id,
            commit_sha: event.head_sha.clone(),
            ..Default::default()
        }
    }
}

impl OrchestrationState {
    pub fn repo(&self) -> RepoRef {
        RepoRef::new(&self.owner, &self.repo_name)
    }

    /// Identity of one orchestration instance: one PR head commit.
    pub fn key(&self) -> String {
        format!(
            "{}/{}#{}@{}",
            self.owner, self.repo_name, self.pull_request_number, self.commit_sha
        )
    }

    pub fn has_pipeline(&self) -> bool {
        !self.pipeline_id.is_empty()
    }

    /// Phase the next poll invocation starts in.
    pub fn phase(&self) -> PollPhase {
        if self.all_jobs_done {
            PollPhase::Complete
        } else if self.workflow_ids.is_empty() {
            PollPhase::ResolvingWorkflows
        } else {
            PollPhase::PollingJobs
        }
    }

    /// Set the wait to 2^retry_count, then bump the retry count.
    pub fn advance_backoff(&mut self) {
        self.wait_for_jobs_wait_time = 2u64.saturating_pow(self.wait_for_jobs_retry_count);
        self.wait_for_jobs_retry_count = self.wait_for_jobs_retry_count.saturating_add(1);
    }

    pub fn wait_duration(&self, unit: Duration) -> Duration {
        unit.saturating_mul(u32::try_from(self.wait_for_jobs_wait_time).unwrap_or(u32::MAX))
    }

    pub fn is_reported(&self, job_id: &str) -> bool {
        self.reported_jobs.iter().any(|id| id == job_id)
    }
}
