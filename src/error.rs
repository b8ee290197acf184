use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Webhook verification failed: {0}")]
    Unauthorized(String),

    #[error("No pipeline found for commit {commit_sha} yet")]
    PipelineNotFound { commit_sha: String },

    #[error("Upstream unavailable while {context}: {source}")]
    UpstreamUnavailable {
        context: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("CircleCI API error ({status}): {message}")]
    CircleCiApi { status: u16, message: String },

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Failed to report job {job}: {source}")]
    ReportingFailed {
        job: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Gave up on {step} after {attempts} attempts")]
    RetriesExhausted { step: &'static str, attempts: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn upstream(context: impl Into<String>, source: AppError) -> Self {
        AppError::UpstreamUnavailable {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn reporting(job: impl Into<String>, source: AppError) -> Self {
        AppError::ReportingFailed {
            job: job.into(),
            source: Box::new(source),
        }
    }

    /// Whether re-invoking the same step later may succeed.
    ///
    /// `ReportingFailed` is never retryable; it always surfaces.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::PipelineNotFound { .. }
                | AppError::UpstreamUnavailable { .. }
                | AppError::CircleCiApi { .. }
                | AppError::GitHubApi(_)
                | AppError::Http(_)
        )
    }
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::GitHubApi(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
