use axum::http::{HeaderMap, Method};

use crate::error::{AppError, Result};
use crate::webhook::events::{PullRequestEvent, WebhookEvent};
use crate::webhook::signature::{
    verify_signature, SignatureScheme, SIGNATURE_256_HEADER, SIGNATURE_SHA1_HEADER,
};

pub const EVENT_HEADER: &str = "x-github-event";

/// Result of gating an inbound notification.
#[derive(Debug)]
pub enum Normalized {
    Accepted(PullRequestEvent),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    Ping,
    EventKind(String),
    Action(String),
    /// Signed, but not a pull-request payload this app can read.
    MalformedPayload(String),
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::Ping => f.write_str("ping"),
            IgnoreReason::EventKind(kind) => write!(f, "unsupported event kind {kind}"),
            IgnoreReason::Action(action) => write!(f, "pull_request action {action}"),
            IgnoreReason::MalformedPayload(e) => write!(f, "unreadable payload: {e}"),
        }
    }
}

/// Validate and parse a raw webhook delivery.
///
/// Checks run in order: method, event header, signature. Only then is the
/// body parsed, so unauthenticated payloads never reach serde. A signed body
/// that does not parse is ignored rather than rejected.
pub fn normalize(
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
    secret: &str,
) -> Result<Normalized> {
    if method != Method::POST {
        return Err(AppError::InvalidRequest(format!(
            "Expected POST, got {method}"
        )));
    }

    let event_type = header_str(headers, EVENT_HEADER)
        .ok_or_else(|| AppError::InvalidRequest("Missing X-GitHub-Event header".to_string()))?;

    let (signature, scheme) = match header_str(headers, SIGNATURE_256_HEADER) {
        Some(sig) => (sig, SignatureScheme::Sha256),
        None => match header_str(headers, SIGNATURE_SHA1_HEADER) {
            Some(sig) => (sig, SignatureScheme::Sha1),
            None => {
                return Err(AppError::Unauthorized(
                    "Missing X-Hub-Signature-256 header".to_string(),
                ))
            }
        },
    };

    verify_signature(secret, body, signature, scheme)?;

    let event = match WebhookEvent::parse(event_type, body) {
        Ok(event) => event,
        Err(e) => {
            return Ok(Normalized::Ignored(IgnoreReason::MalformedPayload(format!(
                "{event_type}: {e}"
            ))))
        }
    };

    match event {
        WebhookEvent::PullRequest(payload) => {
            let event = match PullRequestEvent::try_from(payload) {
                Ok(event) => event,
                Err(e) => {
                    return Ok(Normalized::Ignored(IgnoreReason::MalformedPayload(
                        e.to_string(),
                    )))
                }
            };
            if event.action.is_actionable() {
                Ok(Normalized::Accepted(event))
            } else {
                Ok(Normalized::Ignored(IgnoreReason::Action(event.action.to_string())))
            }
        }
        WebhookEvent::Ping => Ok(Normalized::Ignored(IgnoreReason::Ping)),
        WebhookEvent::Unsupported(kind) => Ok(Normalized::Ignored(IgnoreReason::EventKind(kind))),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
