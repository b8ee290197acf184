use crate::error::Result;
use crate::platform::Platform;
use crate::webhook::events::PullRequestEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPresence {
    Present,
    /// No CI config on the head branch; the invitation comment was posted.
    Absent,
}

pub fn missing_config_comment(config_path: &str) -> String {
    format!(
        "You don't seem to have a `{config_path}` file in your repo.\n\
         Register with CircleCI to use this GitHub App."
    )
}

/// Check the PR head branch for a CI config before any orchestration starts.
///
/// Any error other than "absent" fails the whole flow.
pub async fn ensure_ci_config(
    platform: &dyn Platform,
    event: &PullRequestEvent,
    config_path: &str,
) -> Result<ConfigPresence> {
    let present = platform
        .file_exists(event.installation_id, &event.repo, config_path, &event.head_ref)
        .await?;

    if present {
        return Ok(ConfigPresence::Present);
    }

    tracing::info!(
        repo = %event.repo,
        pr = event.number,
        path = %config_path,
        "No CI config on head branch, posting invitation comment"
    );

    platform
        .post_comment(
            event.installation_id,
            &event.repo,
            event.number,
            &missing_config_comment(config_path),
        )
        .await?;

    Ok(ConfigPresence::Absent)
}
