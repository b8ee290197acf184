use std::sync::Arc;

use axum::routing::{any, get};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::platform::Platform;
use crate::scheduler::Scheduler;

pub struct AppState {
    pub config: AppConfig,
    pub platform: Arc<dyn Platform>,
    pub scheduler: Arc<dyn Scheduler>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        platform: Arc<dyn Platform>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            config,
            platform,
            scheduler,
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Any method: non-POST deliveries are answered 403 by the normalizer.
        .route("/webhooks/github", any(crate::webhook::handler::handle_webhook))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
