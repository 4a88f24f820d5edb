use anyhow::Result;
use presto_exporter::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!("starting {} {}...", version::NAME, version::VERSION);

    let client = client::PrestoClient::new(app_config.presto.url.clone());
    let registry = Arc::new(
        collector::ExporterRegistry::presto(client, &app_config.exporter.namespace)
            .map_err(|e| anyhow::anyhow!("collectors: {}", e))?,
    );
    tracing::info!(
        upstream = %app_config.presto.url,
        collectors = registry.len(),
        "collectors registered"
    );

    let app = routes::app(registry, app_config.clone());
    let addr = app_config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        "Listening on http://{}{}",
        addr,
        app_config.server.metrics_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Received shutdown signal");
}
