//! In-memory collaborators and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};
use serde_json::json;

use crate::circleci::types::{
    Action, Build, BuildOutputLine, Job, JobStatus, Pipeline, PipelineVcs, Step, WorkflowRef,
};
use crate::circleci::{LegacyBuildApi, PipelineApi};
use crate::config::{
    AppConfig, CircleCiConfig, GitHubConfig, ReportConfig, SchedulerConfig, ServerConfig,
};
use crate::error::{AppError, Result};
use crate::orchestration::report::FailureReporter;
use crate::orchestration::state::OrchestrationState;
use crate::platform::types::RepoRef;
use crate::platform::Platform;
use crate::scheduler::Scheduler;
use crate::webhook::events::{PullRequestAction, PullRequestEvent};
use crate::webhook::normalize::EVENT_HEADER;
use crate::webhook::signature::{sign_sha256, SIGNATURE_256_HEADER};

pub const TEST_SECRET: &str = "It's a Secret to Everybody";
pub const HEAD_SHA: &str = "0123456789abcdef0123456789abcdef01234567";
pub const OWNER: &str = "acme";
pub const REPO: &str = "widgets";
pub const PR_NUMBER: u64 = 42;
pub const INSTALLATION_ID: u64 = 99;
pub const HEAD_REF: &str = "feature/retry";

// --- Fixtures ---

pub fn pull_request_body(action: &str) -> Vec<u8> {
    json!({
        "action": action,
        "number": PR_NUMBER,
        "pull_request": {
            "number": PR_NUMBER,
            "head": { "ref": HEAD_REF, "sha": HEAD_SHA }
        },
        "repository": {
            "name": REPO,
            "full_name": format!("{OWNER}/{REPO}"),
            "owner": { "login": OWNER }
        },
        "installation": { "id": INSTALLATION_ID }
    })
    .to_string()
    .into_bytes()
}

pub fn signed_headers(event: &str, body: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(EVENT_HEADER, HeaderValue::from_str(event).unwrap());
    headers.insert(
        SIGNATURE_256_HEADER,
        HeaderValue::from_str(&sign_sha256(TEST_SECRET, body)).unwrap(),
    );
    headers
}

pub fn pull_request_event() -> PullRequestEvent {
    PullRequestEvent {
        action: PullRequestAction::Opened,
        repo: RepoRef::new(OWNER, REPO),
        number: PR_NUMBER,
        head_sha: HEAD_SHA.to_string(),
        head_ref: HEAD_REF.to_string(),
        installation_id: INSTALLATION_ID,
    }
}

pub fn test_state(commit_sha: &str) -> OrchestrationState {
    OrchestrationState {
        repo_name: REPO.to_string(),
        owner: OWNER.to_string(),
        pull_request_number: PR_NUMBER,
        installation_id: INSTALLATION_ID,
        commit_sha: commit_sha.to_string(),
        ..Default::default()
    }
}

/// A record that has already been correlated to `pipeline_id`.
pub fn polling_state(pipeline_id: &str) -> OrchestrationState {
    OrchestrationState {
        pipeline_id: pipeline_id.to_string(),
        ..test_state(HEAD_SHA)
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        github: GitHubConfig {
            app_id: 1,
            private_key_path: PathBuf::from("/nonexistent/key.pem"),
            webhook_secret: TEST_SECRET.to_string(),
            api_base_url: None,
            ci_config_path: ".circleci/config.yml".to_string(),
        },
        circleci: CircleCiConfig {
            token: "circle-test-token".to_string(),
            api_base_url: "http://127.0.0.1:1/api/v2".to_string(),
            legacy_api_base_url: "http://127.0.0.1:1/api/v1.1".to_string(),
            vcs_slug: "gh".to_string(),
            request_timeout_secs: 5,
        },
        scheduler: SchedulerConfig::default(),
        report: ReportConfig::default(),
    }
}

pub fn pipeline(id: &str, revision: &str, workflow_ids: &[&str]) -> Pipeline {
    Pipeline {
        id: id.to_string(),
        number: 1,
        state: "created".to_string(),
        vcs: Some(PipelineVcs {
            revision: revision.to_string(),
            branch: Some(HEAD_REF.to_string()),
        }),
        workflows: workflow_ids
            .iter()
            .map(|id| WorkflowRef {
                id: id.to_string(),
                name: None,
                status: None,
            })
            .collect(),
    }
}

pub fn job(id: &str, number: u64, status: &str) -> Job {
    Job {
        id: id.to_string(),
        name: format!("job-{number}"),
        job_number: Some(number),
        status: JobStatus::from(status.to_string()),
        job_type: "build".to_string(),
    }
}

pub fn action(index: u32, status: &str, output_url: Option<&str>) -> Action {
    Action {
        index,
        step: 0,
        name: format!("action {index}"),
        status: status.to_string(),
        output_url: output_url.map(str::to_string),
    }
}

pub fn build(build_num: u64, steps: Vec<(&str, Vec<Action>)>) -> Build {
    Build {
        build_num,
        status: "failed".to_string(),
        steps: steps
            .into_iter()
            .map(|(name, actions)| Step {
                name: name.to_string(),
                actions,
            })
            .collect(),
    }
}

fn not_found(what: &str) -> AppError {
    AppError::CircleCiApi {
        status: 404,
        message: format!("{what} not found"),
    }
}

// --- CircleCI fakes ---

#[derive(Default)]
pub struct FakePipelineApi {
    pipelines: Mutex<Vec<Pipeline>>,
    jobs: Mutex<HashMap<String, Vec<Job>>>,
    /// Per-workflow snapshots served one per fetch; the last one repeats.
    job_snapshots: Mutex<HashMap<String, Vec<Vec<Job>>>>,
    failing_listing: bool,
    failing_job_fetches: Mutex<usize>,
    listing_calls: Mutex<usize>,
    pipeline_fetches: Mutex<usize>,
    job_fetches: Mutex<HashMap<String, usize>>,
}

impl FakePipelineApi {
    pub fn with_pipelines(self, pipelines: Vec<Pipeline>) -> Self {
        *self.pipelines.lock().unwrap() = pipelines;
        self
    }

    pub fn with_jobs(self, workflow_id: &str, jobs: Vec<Job>) -> Self {
        self.set_jobs(workflow_id, jobs);
        self
    }

    pub fn with_job_snapshots(self, workflow_id: &str, snapshots: Vec<Vec<Job>>) -> Self {
        self.job_snapshots
            .lock()
            .unwrap()
            .insert(workflow_id.to_string(), snapshots);
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.failing_listing = true;
        self
    }

    /// The next `count` job fetches fail with a 503.
    pub fn failing_job_fetches(self, count: usize) -> Self {
        *self.failing_job_fetches.lock().unwrap() = count;
        self
    }

    pub fn set_jobs(&self, workflow_id: &str, jobs: Vec<Job>) {
        self.jobs.lock().unwrap().insert(workflow_id.to_string(), jobs);
    }

    pub fn listing_calls(&self) -> usize {
        *self.listing_calls.lock().unwrap()
    }

    pub fn pipeline_fetches(&self) -> usize {
        *self.pipeline_fetches.lock().unwrap()
    }

    pub fn job_fetches(&self, workflow_id: &str) -> usize {
        self.job_fetches
            .lock()
            .unwrap()
            .get(workflow_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PipelineApi for FakePipelineApi {
    async fn list_project_pipelines(&self, _owner: &str, _repo: &str) -> Result<Vec<Pipeline>> {
        *self.listing_calls.lock().unwrap() += 1;
        if self.failing_listing {
            return Err(AppError::CircleCiApi {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(self.pipelines.lock().unwrap().clone())
    }

    async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline> {
        *self.pipeline_fetches.lock().unwrap() += 1;
        self.pipelines
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == pipeline_id)
            .cloned()
            .ok_or_else(|| not_found("Pipeline"))
    }

    async fn get_workflow_jobs(&self, workflow_id: &str) -> Result<Vec<Job>> {
        *self
            .job_fetches
            .lock()
            .unwrap()
            .entry(workflow_id.to_string())
            .or_default() += 1;

        {
            let mut failing = self.failing_job_fetches.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(AppError::CircleCiApi {
                    status: 503,
                    message: "Service Unavailable".to_string(),
                });
            }
        }

        if let Some(snapshots) = self.job_snapshots.lock().unwrap().get_mut(workflow_id) {
            if snapshots.len() > 1 {
                return Ok(snapshots.remove(0));
            }
            if let Some(last) = snapshots.first() {
                return Ok(last.clone());
            }
        }

        self.jobs
            .lock()
            .unwrap()
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| not_found("Workflow"))
    }
}

#[derive(Default)]
pub struct FakeLegacyApi {
    builds: HashMap<u64, Build>,
    outputs: HashMap<String, Vec<String>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeLegacyApi {
    pub fn with_build(mut self, build_num: u64, build: Build) -> Self {
        self.builds.insert(build_num, build);
        self
    }

    pub fn with_output(mut self, url: &str, messages: &[&str]) -> Self {
        self.outputs.insert(
            url.to_string(),
            messages.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    /// Output URLs fetched so far, in order.
    pub fn fetched_outputs(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl LegacyBuildApi for FakeLegacyApi {
    async fn get_build(&self, _owner: &str, _repo: &str, build_num: u64) -> Result<Build> {
        self.builds
            .get(&build_num)
            .cloned()
            .ok_or_else(|| not_found("Build"))
    }

    async fn get_action_output(&self, output_url: &str) -> Result<Vec<BuildOutputLine>> {
        self.fetched.lock().unwrap().push(output_url.to_string());
        let messages = self
            .outputs
            .get(output_url)
            .ok_or_else(|| not_found("Output"))?;
        Ok(messages
            .iter()
            .map(|message| BuildOutputLine {
                message: message.clone(),
                time: None,
                kind: "out".to_string(),
            })
            .collect())
    }
}

// --- Platform fake ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedComment {
    pub installation_id: u64,
    pub repo: RepoRef,
    pub issue_number: u64,
    pub body: String,
}

pub struct FakePlatform {
    ci_config_present: bool,
    failing_lookup: bool,
    failing_comments: bool,
    checked_paths: Mutex<Vec<(String, String)>>,
    comments: Mutex<Vec<PostedComment>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            ci_config_present: true,
            failing_lookup: false,
            failing_comments: false,
            checked_paths: Mutex::new(Vec::new()),
            comments: Mutex::new(Vec::new()),
        }
    }
}

impl FakePlatform {
    pub fn without_ci_config(mut self) -> Self {
        self.ci_config_present = false;
        self
    }

    pub fn failing_lookup(mut self) -> Self {
        self.failing_lookup = true;
        self
    }

    pub fn failing_comments(mut self) -> Self {
        self.failing_comments = true;
        self
    }

    pub fn comments(&self) -> Vec<PostedComment> {
        self.comments.lock().unwrap().clone()
    }

    /// `(path, git_ref)` pairs passed to `file_exists`.
    pub fn checked_paths(&self) -> Vec<(String, String)> {
        self.checked_paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn file_exists(
        &self,
        _installation_id: u64,
        _repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<bool> {
        self.checked_paths
            .lock()
            .unwrap()
            .push((path.to_string(), git_ref.to_string()));
        if self.failing_lookup {
            return Err(AppError::GitHubApi("502 Bad Gateway".to_string()));
        }
        Ok(self.ci_config_present)
    }

    async fn post_comment(
        &self,
        installation_id: u64,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<()> {
        if self.failing_comments {
            return Err(AppError::GitHubApi("403 Resource not accessible".to_string()));
        }
        self.comments.lock().unwrap().push(PostedComment {
            installation_id,
            repo: repo.clone(),
            issue_number,
            body: body.to_string(),
        });
        Ok(())
    }
}

// --- Orchestration fakes ---

#[derive(Default)]
pub struct RecordingReporter {
    failing_on: Option<u64>,
    reported: Mutex<Vec<u64>>,
}

impl RecordingReporter {
    pub fn failing_on(mut self, job_number: u64) -> Self {
        self.failing_on = Some(job_number);
        self
    }

    /// Job numbers reported successfully, in order.
    pub fn reported(&self) -> Vec<u64> {
        self.reported.lock().unwrap().clone()
    }
}

#[async_trait]
impl FailureReporter for RecordingReporter {
    async fn report_failed_job(&self, _state: &OrchestrationState, job: &Job) -> Result<()> {
        let number = job.job_number.unwrap_or_default();
        if self.failing_on == Some(number) {
            return Err(AppError::reporting(
                job.label(),
                AppError::GitHubApi("comment rejected".to_string()),
            ));
        }
        self.reported.lock().unwrap().push(number);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingScheduler {
    started: Mutex<Vec<OrchestrationState>>,
}

impl RecordingScheduler {
    pub fn started(&self) -> Vec<OrchestrationState> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn start(&self, state: OrchestrationState) -> Result<()> {
        self.started.lock().unwrap().push(state);
        Ok(())
    }
}
