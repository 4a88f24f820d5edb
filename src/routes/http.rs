// GET handlers: index page, version, metrics

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use prometheus::{Encoder, TextEncoder};
use tracing::error;

use super::AppState;
use crate::version::{NAME, VERSION};

/// Encoding the gathered families failed; the only case /metrics does not answer 200.
#[derive(Debug)]
pub(super) struct MetricsError;

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// GET / — landing page linking to the metrics path.
pub(super) async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>Presto Exporter</title></head>
<body>
<h1>Presto Exporter</h1>
<p><a href="{path}">Metrics</a></p>
</body>
</html>
"#,
        path = state.config.server.metrics_path
    ))
}

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /metrics — scrapes every collector and renders the text exposition format.
/// Upstream failures are already folded into `*_up 0` samples.
pub(super) async fn metrics_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MetricsError> {
    let families = state.registry.gather().await;
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        error!(error = %e, "failed to encode metrics");
        return Err(MetricsError);
    }
    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    ))
}
