use serde::Deserialize;
use std::path::Path;

use crate::collector::NAMESPACE;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub presto: PrestoConfig,
    pub exporter: ExporterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path the Prometheus text exposition is served under.
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9430,
            metrics_path: "/metrics".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrestoConfig {
    /// Base URL of the admin API; `cluster` and `query` are appended to its path.
    /// Not validated here: a bad URL shows up as `up 0` on every scrape.
    pub url: String,
}

impl Default for PrestoConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/v1".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Prefix of every exported metric name.
    pub namespace: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            namespace: NAMESPACE.into(),
        }
    }
}

impl AppConfig {
    /// Loads `$CONFIG_FILE`, else `config.toml` if present, else built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::load_from_path(&path),
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from_path(DEFAULT_CONFIG_PATH)
            }
            Err(_) => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read config {}: {}", path.display(), e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            self.server.metrics_path.starts_with('/') && self.server.metrics_path != "/",
            "server.metrics_path must start with '/' and not be the root, got {:?}",
            self.server.metrics_path
        );
        anyhow::ensure!(
            self.server.metrics_path != "/version",
            "server.metrics_path must not be /version"
        );
        let ns = &self.exporter.namespace;
        anyhow::ensure!(
            !ns.is_empty()
                && !ns.starts_with(|c: char| c.is_ascii_digit())
                && ns.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "exporter.namespace must match [a-zA-Z_][a-zA-Z0-9_]*, got {:?}",
            ns
        );
        Ok(())
    }
}
