use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};

use crate::error::AppError;
use crate::orchestration::presence::{ensure_ci_config, ConfigPresence};
use crate::orchestration::state::OrchestrationState;
use crate::server::AppState;
use crate::webhook::normalize::{normalize, Normalized};

pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let event = match normalize(&method, &headers, &body, state.config.webhook_secret()) {
        Ok(Normalized::Accepted(event)) => event,
        Ok(Normalized::Ignored(reason)) => {
            tracing::debug!(reason = %reason, "Ignoring webhook");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected webhook");
            return error_status(&e);
        }
    };

    tracing::info!(
        repo = %event.repo,
        pr = event.number,
        action = %event.action,
        sha = %event.head_sha,
        "Accepted pull request event"
    );

    let ci_config_path = &state.config.github.ci_config_path;
    match ensure_ci_config(state.platform.as_ref(), &event, ci_config_path).await {
        Ok(ConfigPresence::Present) => {}
        Ok(ConfigPresence::Absent) => return StatusCode::OK,
        Err(e) => {
            tracing::error!(
                repo = %event.repo,
                pr = event.number,
                error = %e,
                "CI config check failed"
            );
            return error_status(&e);
        }
    }

    if let Err(e) = state.scheduler.start(OrchestrationState::from(&event)).await {
        tracing::error!(
            repo = %event.repo,
            pr = event.number,
            error = %e,
            "Failed to start orchestration"
        );
        return error_status(&e);
    }

    StatusCode::OK
}

fn error_status(e: &AppError) -> StatusCode {
    match e {
        AppError::InvalidRequest(_) | AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
