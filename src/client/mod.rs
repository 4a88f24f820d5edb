// Presto admin API client: GET {base}/cluster and GET {base}/query

mod cluster;
mod query;

pub use cluster::ClusterSnapshot;
pub use query::{ErrorCode, QueryRecord, QueryStats};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::fmt;
use url::Url;

/// Step of a fetch that failed; logged alongside the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    PathResolution,
    Transport,
    BodyRead,
    Status,
    Decode,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchStage::PathResolution => "path-resolution",
            FetchStage::Transport => "transport",
            FetchStage::BodyRead => "body-read",
            FetchStage::Status => "status",
            FetchStage::Decode => "decode",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to get {resource} path: {source}")]
    PathResolution {
        resource: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to get {resource} metrics: {source}")]
    Transport {
        resource: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read {resource} response body: {source}")]
    BodyRead {
        resource: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to get {resource} metrics: {body} {status}")]
    Status {
        resource: &'static str,
        status: u16,
        body: String,
    },
    #[error("failed to unmarshal {resource} metrics output: {source}: {body}")]
    Decode {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl FetchError {
    pub fn stage(&self) -> FetchStage {
        match self {
            FetchError::PathResolution { .. } => FetchStage::PathResolution,
            FetchError::Transport { .. } => FetchStage::Transport,
            FetchError::BodyRead { .. } => FetchStage::BodyRead,
            FetchError::Status { .. } => FetchStage::Status,
            FetchError::Decode { .. } => FetchStage::Decode,
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            FetchError::PathResolution { resource, .. }
            | FetchError::Transport { resource, .. }
            | FetchError::BodyRead { resource, .. }
            | FetchError::Status { resource, .. }
            | FetchError::Decode { resource, .. } => *resource,
        }
    }
}

/// Client for the Presto `/v1` admin API. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct PrestoClient {
    http: reqwest::Client,
    base_url: String,
}

impl PrestoClient {
    /// The base URL is not parsed here; a malformed one fails each fetch instead.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(crate::version::user_agent())
            .build()
            .unwrap_or_default();
        Self::with_http_client(http, base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{resource}`, with any trailing slash on the base path dropped.
    pub(crate) fn resource_url(&self, resource: &'static str) -> Result<Url, FetchError> {
        let path_err = |source: url::ParseError| FetchError::PathResolution { resource, source };
        let mut url = Url::parse(&self.base_url).map_err(path_err)?;
        if url.cannot_be_a_base() {
            return Err(path_err(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let path = format!("{}/{}", url.path().trim_end_matches('/'), resource);
        url.set_path(&path);
        Ok(url)
    }

    /// One GET, no retries. The body is read before the status check so a non-200
    /// error can carry it.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &'static str,
    ) -> Result<T, FetchError> {
        let url = self.resource_url(resource)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport { resource, source })?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|source| FetchError::BodyRead { resource, source })?;

        if status != StatusCode::OK {
            return Err(FetchError::Status {
                resource,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            resource,
            source,
            body,
        })
    }
}
