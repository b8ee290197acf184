use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::platform::types::RepoRef;

/// Top-level webhook event parsed from the payload based on X-GitHub-Event header.
#[derive(Debug)]
pub enum WebhookEvent {
    PullRequest(PullRequestWebhook),
    Ping,
    Unsupported(String),
}

#[derive(Debug, Deserialize)]
pub struct PullRequestWebhook {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequestPayload,
    pub repository: RepositoryPayload,
    pub installation: Option<InstallationPayload>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    pub head: PullRequestRef,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryPayload {
    pub name: String,
    pub full_name: String,
    pub owner: OwnerPayload,
}

#[derive(Debug, Deserialize)]
pub struct OwnerPayload {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct InstallationPayload {
    pub id: u64,
}

impl WebhookEvent {
    pub fn parse(event_type: &str, payload: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        match event_type {
            "pull_request" => {
                let event: PullRequestWebhook = serde_json::from_slice(payload)?;
                Ok(WebhookEvent::PullRequest(event))
            }
            "ping" => Ok(WebhookEvent::Ping),
            other => Ok(WebhookEvent::Unsupported(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestAction {
    Opened,
    /// New commits were pushed to the head branch.
    Synchronize,
    Other(String),
}

impl PullRequestAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "opened" => PullRequestAction::Opened,
            "synchronize" => PullRequestAction::Synchronize,
            other => PullRequestAction::Other(other.to_string()),
        }
    }

    /// Only these actions produce a new head commit worth following.
    pub fn is_actionable(&self) -> bool {
        matches!(self, PullRequestAction::Opened | PullRequestAction::Synchronize)
    }
}

impl std::fmt::Display for PullRequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PullRequestAction::Opened => f.write_str("opened"),
            PullRequestAction::Synchronize => f.write_str("synchronize"),
            PullRequestAction::Other(other) => f.write_str(other),
        }
    }
}

/// Canonical pull-request event, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    pub repo: RepoRef,
    pub number: u64,
    pub head_sha: String,
    pub head_ref: String,
    pub installation_id: u64,
}

impl TryFrom<PullRequestWebhook> for PullRequestEvent {
    type Error = AppError;

    fn try_from(payload: PullRequestWebhook) -> Result<Self> {
        let installation_id = payload
            .installation
            .map(|inst| inst.id)
            .ok_or_else(|| {
                AppError::InvalidRequest("No installation ID in pull_request event".to_string())
            })?;

        Ok(Self {
            action: PullRequestAction::parse(&payload.action),
            repo: RepoRef::new(payload.repository.owner.login, payload.repository.name),
            number: payload.number,
            head_sha: payload.pull_request.head.sha,
            head_ref: payload.pull_request.head.ref_name,
            installation_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pull_request_event() {
        let body = json!({
            "action": "synchronize",
            "number": 12,
            "pull_request": {"number": 12, "head": {"ref": "feature/x", "sha": "deadbeef"}},
            "repository": {"name": "widgets", "full_name": "acme/widgets", "owner": {"login": "acme"}},
            "installation": {"id": 99}
        });
        let bytes = serde_json::to_vec(&body).unwrap();

        let WebhookEvent::PullRequest(payload) = WebhookEvent::parse("pull_request", &bytes).unwrap()
        else {
            panic!("expected a pull_request event");
        };
        let event = PullRequestEvent::try_from(payload).unwrap();

        assert_eq!(event.action, PullRequestAction::Synchronize);
        assert_eq!(event.repo, RepoRef::new("acme", "widgets"));
        assert_eq!(event.number, 12);
        assert_eq!(event.head_sha, "deadbeef");
        assert_eq!(event.head_ref, "feature/x");
        assert_eq!(event.installation_id, 99);
    }

    #[test]
    fn test_missing_installation_is_invalid() {
        let body = json!({
            "action": "opened",
            "number": 1,
            "pull_request": {"number": 1, "head": {"ref": "main", "sha": "abc"}},
            "repository": {"name": "widgets", "full_name": "acme/widgets", "owner": {"login": "acme"}}
        });
        let payload: PullRequestWebhook = serde_json::from_value(body).unwrap();
        let err = PullRequestEvent::try_from(payload).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn test_action_filter() {
        assert!(PullRequestAction::parse("opened").is_actionable());
        assert!(PullRequestAction::parse("synchronize").is_actionable());
        for action in ["closed", "reopened", "edited", "labeled", "ready_for_review"] {
            assert!(!PullRequestAction::parse(action).is_actionable(), "{action}");
        }
    }

    #[test]
    fn test_unsupported_event_kind() {
        let event = WebhookEvent::parse("push", b"{}").unwrap();
        assert!(matches!(event, WebhookEvent::Unsupported(kind) if kind == "push"));
    }
}
