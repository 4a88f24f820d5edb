// HTTP routes: index, version, Prometheus exposition

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::collector::ExporterRegistry;
use crate::config::AppConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) registry: Arc<ExporterRegistry>,
    pub(crate) config: AppConfig,
}

pub fn app(registry: Arc<ExporterRegistry>, config: AppConfig) -> Router {
    let metrics_path = config.server.metrics_path.clone();
    let state = AppState { registry, config };
    Router::new()
        .route("/", get(http::index_handler)) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(&metrics_path, get(http::metrics_handler)) // GET /metrics (configurable)
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
