// GET {base}/query: in-flight and recently completed queries

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{FetchError, PrestoClient};
use crate::duration::Elapsed;

const RESOURCE: &str = "query";

/// One entry of the `v1/query` list. Only the fields the exporter aggregates are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecord {
    #[serde(default)]
    pub resource_group_id: Option<Vec<String>>,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default)]
    pub query_stats: QueryStats,
}

impl QueryRecord {
    /// Resource group path segments; empty when the engine reported none.
    pub fn resource_group(&self) -> &[String] {
        self.resource_group_id.as_deref().unwrap_or_default()
    }

    /// Error classification (`USER_ERROR`, `INTERNAL_ERROR`, ...), if the query failed.
    pub fn error_type(&self) -> Option<&str> {
        self.error_code.as_ref().and_then(|c| c.kind.as_deref())
    }
}

/// Presto error code. Usually an object `{code, name, type}`; a bare string is read as the type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ErrorCodeRepr")]
pub struct ErrorCode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorCodeRepr {
    Type(String),
    Full {
        #[serde(default)]
        code: Option<i64>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "type")]
        kind: Option<String>,
    },
}

impl From<ErrorCodeRepr> for ErrorCode {
    fn from(repr: ErrorCodeRepr) -> Self {
        match repr {
            ErrorCodeRepr::Type(kind) => ErrorCode {
                kind: Some(kind),
                ..Default::default()
            },
            ErrorCodeRepr::Full { code, name, kind } => ErrorCode { code, name, kind },
        }
    }
}

/// Timing of one query. An absent key is zero; a present key must be a valid duration string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryStats {
    pub queued_time: Elapsed,
    pub elapsed_time: Elapsed,
    pub execution_time: Elapsed,
    pub total_cpu_time: Elapsed,
    pub total_scheduled_time: Elapsed,
}

impl PrestoClient {
    #[instrument(skip(self), fields(client = "presto", resource = RESOURCE))]
    pub async fn fetch_queries(&self) -> Result<Vec<QueryRecord>, FetchError> {
        self.get_json(RESOURCE).await
    }
}
