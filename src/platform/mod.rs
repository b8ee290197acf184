pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::RepoRef;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Check whether `path` exists in the repository at `git_ref`.
    ///
    /// A 404 is `Ok(false)`; any other failure is an error.
    async fn file_exists(
        &self,
        installation_id: u64,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<bool>;

    /// Post a comment on an issue or PR.
    async fn post_comment(
        &self,
        installation_id: u64,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<()>;
}
