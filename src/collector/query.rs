// presto_queries_* : v1/query aggregated by resource group and by state

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::Collector;
use super::sample::{MetricDesc, Samples, ValueType};
use crate::client::{PrestoClient, QueryRecord};

const SUBSYSTEM: &str = "queries";

/// Error type whose queries are counted under their own state label.
pub const USER_ERROR: &str = "USER_ERROR";

/// Dot-joined resource group path; `""` for an empty path.
pub fn resource_group_key(path: &[String]) -> String {
    path.join(".")
}

/// State label a query is counted under: `USER_ERROR` for user errors, else its state.
pub fn state_label(query: &QueryRecord) -> &str {
    if query.error_type() == Some(USER_ERROR) {
        USER_ERROR
    } else {
        &query.state
    }
}

/// Summed durations of every query in one resource group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupDurations {
    pub queue: Duration,
    pub elapsed: Duration,
    pub execution: Duration,
}

impl GroupDurations {
    fn add(&mut self, query: &QueryRecord) {
        let stats = &query.query_stats;
        self.queue = self.queue.saturating_add(stats.queued_time.as_duration());
        self.elapsed = self.elapsed.saturating_add(stats.elapsed_time.as_duration());
        self.execution = self
            .execution
            .saturating_add(stats.execution_time.as_duration());
    }
}

/// Result of one pass over the query list. Label cardinality follows whatever the
/// engine reports; nothing is capped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryAggregate {
    pub groups: BTreeMap<String, GroupDurations>,
    pub states: BTreeMap<String, u64>,
}

pub fn aggregate(queries: &[QueryRecord]) -> QueryAggregate {
    let mut agg = QueryAggregate::default();
    for query in queries {
        agg.groups
            .entry(resource_group_key(query.resource_group()))
            .or_default()
            .add(query);
        *agg.states.entry(state_label(query).to_string()).or_default() += 1;
    }
    agg
}

struct QueryDescs {
    up: MetricDesc,
    scrape_duration: MetricDesc,
    queue_time: MetricDesc,
    elapsed_time: MetricDesc,
    execution_time: MetricDesc,
    total: MetricDesc,
}

impl QueryDescs {
    fn new(ns: &str) -> prometheus::Result<Self> {
        Ok(Self {
            up: MetricDesc::new(
                ns,
                SUBSYSTEM,
                "up",
                "Presto API is responding",
                ValueType::Gauge,
                &[],
            )?,
            scrape_duration: MetricDesc::new(
                ns,
                SUBSYSTEM,
                "scrape_duration_seconds",
                "Scrape duration in seconds",
                ValueType::Gauge,
                &[],
            )?,
            queue_time: MetricDesc::new(
                ns,
                SUBSYSTEM,
                "queue_time_seconds",
                "Queue time in seconds",
                ValueType::Gauge,
                &["resource_group"],
            )?,
            elapsed_time: MetricDesc::new(
                ns,
                SUBSYSTEM,
                "elapsed_time_seconds",
                "Elapsed time in seconds",
                ValueType::Gauge,
                &["resource_group"],
            )?,
            execution_time: MetricDesc::new(
                ns,
                SUBSYSTEM,
                "execution_time_seconds",
                "Execution time in seconds",
                ValueType::Gauge,
                &["resource_group"],
            )?,
            total: MetricDesc::new(
                ns,
                SUBSYSTEM,
                "total",
                "Query count",
                ValueType::Gauge,
                &["state"],
            )?,
        })
    }

    fn all(&self) -> [&MetricDesc; 6] {
        [
            &self.up,
            &self.scrape_duration,
            &self.queue_time,
            &self.elapsed_time,
            &self.execution_time,
            &self.total,
        ]
    }

    fn push_aggregate(&self, samples: &mut Samples, agg: &QueryAggregate) {
        for (group, d) in &agg.groups {
            samples.push(&self.queue_time, d.queue.as_secs_f64(), &[group.as_str()]);
            samples.push(&self.elapsed_time, d.elapsed.as_secs_f64(), &[group.as_str()]);
            samples.push(&self.execution_time, d.execution.as_secs_f64(), &[group.as_str()]);
        }
        for (state, count) in &agg.states {
            samples.push(&self.total, *count as f64, &[state.as_str()]);
        }
    }
}

/// Scrapes `v1/query`. At most one scrape per collector is in flight; others wait.
pub struct QueryCollector {
    client: PrestoClient,
    lock: Mutex<()>,
    descs: QueryDescs,
}

impl QueryCollector {
    pub fn new(client: PrestoClient, namespace: &str) -> prometheus::Result<Self> {
        Ok(Self {
            client,
            lock: Mutex::new(()),
            descs: QueryDescs::new(namespace)?,
        })
    }

    pub async fn scrape(&self) -> Vec<MetricFamily> {
        let _guard = self.lock.lock().await;
        let start = Instant::now();
        debug!(collector = SUBSYSTEM, "collecting query metrics");

        let d = &self.descs;
        let mut samples = Samples::new();
        match self.client.fetch_queries().await {
            Ok(queries) => {
                samples.push(&d.up, 1.0, &[]);
                let agg = aggregate(&queries);
                debug!(
                    collector = SUBSYSTEM,
                    queries = queries.len(),
                    groups = agg.groups.len(),
                    states = agg.states.len(),
                    "aggregated queries"
                );
                d.push_aggregate(&mut samples, &agg);
            }
            Err(e) => {
                samples.push(&d.up, 0.0, &[]);
                error!(
                    collector = SUBSYSTEM,
                    stage = %e.stage(),
                    error = %e,
                    "failed to scrape query metrics"
                );
            }
        }
        samples.push(&d.scrape_duration, start.elapsed().as_secs_f64(), &[]);
        samples.into_families()
    }
}

impl Collector for QueryCollector {
    fn describe(&self) -> Vec<&Desc> {
        self.descs.all().into_iter().map(MetricDesc::desc).collect()
    }

    fn collect(&self) -> BoxFuture<'_, Vec<MetricFamily>> {
        self.scrape().boxed()
    }
}
