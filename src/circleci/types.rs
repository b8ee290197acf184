use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Current (v2) API ---

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// One CircleCI pipeline execution.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: String,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub vcs: Option<PipelineVcs>,
    /// Only some endpoints inline this; see `PipelineApi::get_pipeline`.
    #[serde(default)]
    pub workflows: Vec<WorkflowRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineVcs {
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Pipeline {
    /// Commit that triggered this pipeline, if reported.
    pub fn revision(&self) -> Option<&str> {
        self.vcs
            .as_ref()
            .map(|vcs| vcs.revision.as_str())
            .filter(|rev| !rev.is_empty())
    }

    pub fn workflow_ids(&self) -> Vec<String> {
        self.workflows.iter().map(|w| w.id.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Build number in the legacy API; absent for approval jobs.
    #[serde(default)]
    pub job_number: Option<u64>,
    pub status: JobStatus,
    #[serde(rename = "type", default)]
    pub job_type: String,
}

impl Job {
    pub fn label(&self) -> String {
        match self.job_number {
            Some(n) => format!("{} (#{n})", self.name),
            None => self.name.clone(),
        }
    }
}

/// Job status as reported by the v2 API.
///
/// Statuses this crate does not know about are kept verbatim so they
/// round-trip through the orchestration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Success,
    Failed,
    Running,
    Queued,
    NotRun,
    NotRunning,
    Blocked,
    OnHold,
    Canceled,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Running => "running",
            JobStatus::Queued => "queued",
            JobStatus::NotRun => "not_run",
            JobStatus::NotRunning => "not_running",
            JobStatus::Blocked => "blocked",
            JobStatus::OnHold => "on_hold",
            JobStatus::Canceled => "canceled",
            JobStatus::Other(other) => other,
        }
    }

    /// Terminal set is exactly {success, failed}.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "success" => JobStatus::Success,
            "failed" => JobStatus::Failed,
            "running" => JobStatus::Running,
            "queued" => JobStatus::Queued,
            "not_run" => JobStatus::NotRun,
            "not_running" => JobStatus::NotRunning,
            "blocked" => JobStatus::Blocked,
            "on_hold" => JobStatus::OnHold,
            "canceled" => JobStatus::Canceled,
            _ => JobStatus::Other(value),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Legacy (v1.1) API ---

/// Legacy representation of one job: ordered steps, each with parallel actions.
#[derive(Debug, Clone, Deserialize)]
pub struct Build {
    pub build_num: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub name: String,
    /// More than one entry when the step ran with parallelism.
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output_url: Option<String>,
}

impl Action {
    pub fn is_failed(&self) -> bool {
        self.status == "failed"
    }
}

/// One timestamped fragment of an action's output stream.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildOutputLine {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub kind: String,
}
