// Shared test helpers: a fake Presto coordinator and metric family lookups
#![allow(dead_code)]

use axum::{Router, extract::State, http::StatusCode, routing::get};
use prometheus::proto::{MetricFamily, MetricType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap(),
            body: body.into(),
        }
    }
}

/// Request counters for one resource (or for all of them).
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
    total: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct FakeState {
    cluster: Mutex<Reply>,
    query: Mutex<Reply>,
    delay: Mutex<Duration>,
    pub cluster_requests: InFlight,
    pub query_requests: InFlight,
    pub all_requests: InFlight,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            cluster: Mutex::new(Reply::ok(CLUSTER_JSON)),
            query: Mutex::new(Reply::ok(QUERY_JSON)),
            delay: Mutex::new(Duration::ZERO),
            cluster_requests: InFlight::default(),
            query_requests: InFlight::default(),
            all_requests: InFlight::default(),
        }
    }
}

pub struct FakePresto {
    /// Base URL to hand to `PrestoClient` (`http://127.0.0.1:<port>/v1`).
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakePresto {
    pub fn set_cluster(&self, reply: Reply) {
        *self.state.cluster.lock().unwrap() = reply;
    }

    pub fn set_query(&self, reply: Reply) {
        *self.state.query.lock().unwrap() = reply;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = delay;
    }
}

#[derive(Clone, Copy)]
enum Resource {
    Cluster,
    Query,
}

async fn serve(state: &FakeState, resource: Resource) -> (StatusCode, String) {
    let counters = match resource {
        Resource::Cluster => &state.cluster_requests,
        Resource::Query => &state.query_requests,
    };
    counters.enter();
    state.all_requests.enter();

    let delay = *state.delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let reply = match resource {
        Resource::Cluster => state.cluster.lock().unwrap().clone(),
        Resource::Query => state.query.lock().unwrap().clone(),
    };

    state.all_requests.exit();
    counters.exit();
    (reply.status, reply.body)
}

async fn cluster_handler(State(state): State<Arc<FakeState>>) -> (StatusCode, String) {
    serve(&state, Resource::Cluster).await
}

async fn query_handler(State(state): State<Arc<FakeState>>) -> (StatusCode, String) {
    serve(&state, Resource::Query).await
}

/// Starts a fake coordinator on an ephemeral port, serving `/v1/cluster` and `/v1/query`.
pub async fn spawn_presto() -> FakePresto {
    let state = Arc::new(FakeState::default());
    let app = Router::new()
        .route("/v1/cluster", get(cluster_handler))
        .route("/v1/query", get(query_handler))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FakePresto {
        base_url: format!("http://{}/v1", addr),
        state,
    }
}

/// Base URL of a port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/v1", addr)
}

pub const CLUSTER_JSON: &str = r#"{
    "runningQueries": 3,
    "blockedQueries": 1,
    "queuedQueries": 7,
    "activeWorkers": 12,
    "runningDrivers": 240,
    "reservedMemory": 1073741824.0,
    "totalInputRows": 9000000,
    "totalInputBytes": 123456789,
    "totalCpuTimeSecs": 4521
}"#;

/// Two RUNNING queries in group "a" and one user-error failure in group "b".
pub const QUERY_JSON: &str = r#"[
    {
        "resourceGroupId": ["a"],
        "state": "RUNNING",
        "queryStats": {"queuedTime": "1s", "elapsedTime": "10s", "executionTime": "9s"}
    },
    {
        "resourceGroupId": ["a"],
        "state": "RUNNING",
        "queryStats": {"queuedTime": "2s", "elapsedTime": "5s", "executionTime": "3s"}
    },
    {
        "resourceGroupId": ["b"],
        "state": "FAILED",
        "errorCode": {"code": 1, "name": "SYNTAX_ERROR", "type": "USER_ERROR"},
        "queryStats": {"queuedTime": "1s", "elapsedTime": "1.5s", "executionTime": "500ms"}
    }
]"#;

pub fn family<'a>(families: &'a [MetricFamily], name: &str) -> Option<&'a MetricFamily> {
    families.iter().find(|f| f.get_name() == name)
}

/// Value of the first sample of `name`, gauge or counter.
pub fn value(families: &[MetricFamily], name: &str) -> Option<f64> {
    let f = family(families, name)?;
    let m = f.get_metric().first()?;
    Some(match f.get_field_type() {
        MetricType::COUNTER => m.get_counter().get_value(),
        _ => m.get_gauge().get_value(),
    })
}

/// Value of the sample of `name` whose single label equals `label_value`.
pub fn labeled(families: &[MetricFamily], name: &str, label_value: &str) -> Option<f64> {
    family(families, name)?
        .get_metric()
        .iter()
        .find(|m| m.get_label().iter().any(|l| l.get_value() == label_value))
        .map(|m| m.get_gauge().get_value())
}

pub fn sample_count(families: &[MetricFamily]) -> usize {
    families.iter().map(|f| f.get_metric().len()).sum()
}
