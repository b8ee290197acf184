use tokio::signal;

use crate::scheduler::LocalScheduler;

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

/// Abort in-flight orchestrations. Their PRs get no failure comments.
pub async fn graceful_shutdown(scheduler: &LocalScheduler) {
    tracing::info!("Starting graceful shutdown...");

    let aborted = scheduler.abort_all().await;
    if aborted.is_empty() {
        tracing::info!("No in-flight orchestrations");
        return;
    }

    for key in &aborted {
        tracing::warn!(key = %key, "Aborted in-flight orchestration");
    }

    tracing::info!(count = aborted.len(), "Graceful shutdown complete");
}
