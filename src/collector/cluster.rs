// presto_cluster_* : one gauge or counter per v1/cluster field

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::Collector;
use super::sample::{MetricDesc, Samples, ValueType};
use crate::client::{ClusterSnapshot, PrestoClient};

const SUBSYSTEM: &str = "cluster";

struct ClusterDescs {
    up: MetricDesc,
    scrape_duration: MetricDesc,
    running_queries: MetricDesc,
    blocked_queries: MetricDesc,
    queued_queries: MetricDesc,
    active_workers: MetricDesc,
    running_drivers: MetricDesc,
    reserved_memory: MetricDesc,
    input_rows: MetricDesc,
    input_bytes: MetricDesc,
    cpu_seconds: MetricDesc,
}

impl ClusterDescs {
    fn new(ns: &str) -> prometheus::Result<Self> {
        let desc = |name: &str, help: &str, value_type| {
            MetricDesc::new(ns, SUBSYSTEM, name, help, value_type, &[])
        };
        Ok(Self {
            up: desc("up", "Presto API is responding", ValueType::Gauge)?,
            scrape_duration: desc(
                "scrape_duration_seconds",
                "Scrape duration in seconds",
                ValueType::Gauge,
            )?,
            running_queries: desc(
                "running_queries",
                "Running queries of the presto cluster.",
                ValueType::Gauge,
            )?,
            blocked_queries: desc(
                "blocked_queries",
                "Blocked queries of the presto cluster.",
                ValueType::Gauge,
            )?,
            queued_queries: desc(
                "queued_queries",
                "Queued queries of the presto cluster.",
                ValueType::Gauge,
            )?,
            active_workers: desc(
                "active_workers",
                "Active workers of the presto cluster.",
                ValueType::Gauge,
            )?,
            running_drivers: desc(
                "running_drivers",
                "Running drivers of the presto cluster.",
                ValueType::Gauge,
            )?,
            reserved_memory: desc(
                "reserved_memory_bytes",
                "Reserved memory of the presto cluster.",
                ValueType::Gauge,
            )?,
            input_rows: desc(
                "input_rows_total",
                "Total input rows of the presto cluster.",
                ValueType::Counter,
            )?,
            input_bytes: desc(
                "input_bytes_total",
                "Total input bytes of the presto cluster.",
                ValueType::Counter,
            )?,
            cpu_seconds: desc(
                "cpu_seconds_total",
                "Total CPU time of the presto cluster.",
                ValueType::Counter,
            )?,
        })
    }

    fn all(&self) -> [&MetricDesc; 11] {
        [
            &self.up,
            &self.scrape_duration,
            &self.running_queries,
            &self.blocked_queries,
            &self.queued_queries,
            &self.active_workers,
            &self.running_drivers,
            &self.reserved_memory,
            &self.input_rows,
            &self.input_bytes,
            &self.cpu_seconds,
        ]
    }

    fn push_snapshot(&self, samples: &mut Samples, s: &ClusterSnapshot) {
        samples.push(&self.running_queries, s.running_queries, &[]);
        samples.push(&self.blocked_queries, s.blocked_queries, &[]);
        samples.push(&self.queued_queries, s.queued_queries, &[]);
        samples.push(&self.active_workers, s.active_workers, &[]);
        samples.push(&self.running_drivers, s.running_drivers, &[]);
        samples.push(&self.reserved_memory, s.reserved_memory, &[]);
        samples.push(&self.input_rows, s.total_input_rows, &[]);
        samples.push(&self.input_bytes, s.total_input_bytes, &[]);
        samples.push(&self.cpu_seconds, s.total_cpu_time_secs, &[]);
    }
}

/// Scrapes `v1/cluster`. At most one scrape per collector is in flight; others wait.
pub struct ClusterCollector {
    client: PrestoClient,
    lock: Mutex<()>,
    descs: ClusterDescs,
}

impl ClusterCollector {
    pub fn new(client: PrestoClient, namespace: &str) -> prometheus::Result<Self> {
        Ok(Self {
            client,
            lock: Mutex::new(()),
            descs: ClusterDescs::new(namespace)?,
        })
    }

    pub async fn scrape(&self) -> Vec<MetricFamily> {
        let _guard = self.lock.lock().await;
        let start = Instant::now();
        debug!(collector = SUBSYSTEM, "collecting cluster metrics");

        let d = &self.descs;
        let mut samples = Samples::new();
        match self.client.fetch_cluster().await {
            Ok(snapshot) => {
                samples.push(&d.up, 1.0, &[]);
                d.push_snapshot(&mut samples, &snapshot);
            }
            Err(e) => {
                samples.push(&d.up, 0.0, &[]);
                error!(
                    collector = SUBSYSTEM,
                    stage = %e.stage(),
                    error = %e,
                    "failed to scrape cluster metrics"
                );
            }
        }
        samples.push(&d.scrape_duration, start.elapsed().as_secs_f64(), &[]);
        samples.into_families()
    }
}

impl Collector for ClusterCollector {
    fn describe(&self) -> Vec<&Desc> {
        self.descs.all().into_iter().map(MetricDesc::desc).collect()
    }

    fn collect(&self) -> BoxFuture<'_, Vec<MetricFamily>> {
        self.scrape().boxed()
    }
}
