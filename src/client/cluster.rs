// GET {base}/cluster: cluster-wide gauges

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{FetchError, PrestoClient};

const RESOURCE: &str = "cluster";

/// Presto `v1/cluster` output. Missing fields read as zero; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterSnapshot {
    pub running_queries: f64,
    pub blocked_queries: f64,
    pub queued_queries: f64,
    pub active_workers: f64,
    pub running_drivers: f64,
    pub reserved_memory: f64,
    pub total_input_rows: f64,
    pub total_input_bytes: f64,
    pub total_cpu_time_secs: f64,
}

impl PrestoClient {
    #[instrument(skip(self), fields(client = "presto", resource = RESOURCE))]
    pub async fn fetch_cluster(&self) -> Result<ClusterSnapshot, FetchError> {
        self.get_json(RESOURCE).await
    }
}
