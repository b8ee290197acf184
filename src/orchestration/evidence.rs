use async_trait::async_trait;

use crate::error::Result;
use crate::platform::types::RepoRef;

/// Failure output for one job, independent of which CircleCI API produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEvidence {
    pub job_number: u64,
    pub failures: Vec<FailedAction>,
}

/// Output of one failed action, in step order then action order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAction {
    pub step_name: String,
    pub action_index: u32,
    pub output: String,
}

impl FailureEvidence {
    /// Every failed action's output joined in the order encountered.
    pub fn combined_output(&self) -> String {
        self.failures.iter().map(|f| f.output.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.iter().all(|f| f.output.is_empty())
    }
}

/// Adapter boundary: one implementation per CI API generation.
#[async_trait]
pub trait FailureEvidenceSource: Send + Sync {
    async fn collect(&self, repo: &RepoRef, job_number: u64) -> Result<FailureEvidence>;
}
