// Collectors and the registry the /metrics route gathers from

mod cluster;
mod query;
mod sample;

pub use cluster::ClusterCollector;
pub use query::{
    GroupDurations, QueryAggregate, QueryCollector, USER_ERROR, aggregate, resource_group_key,
    state_label,
};
pub use sample::{MetricDesc, Samples, ValueType, fq_name};

use crate::client::PrestoClient;
use futures_util::future::{BoxFuture, join_all};
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use std::collections::HashSet;

/// Default metric name prefix.
pub const NAMESPACE: &str = "presto";

/// A source of samples, run once per scrape.
pub trait Collector: Send + Sync {
    /// Descriptors of every metric this collector can emit.
    fn describe(&self) -> Vec<&Desc>;

    /// Runs one scrape cycle. Never fails: upstream errors are reported through samples.
    fn collect(&self) -> BoxFuture<'_, Vec<MetricFamily>>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("metric {0} is already registered")]
    Duplicate(String),
    #[error("invalid metric descriptor: {0}")]
    Descriptor(#[from] prometheus::Error),
}

/// Registered collectors, gathered together on every scrape.
#[derive(Default)]
pub struct ExporterRegistry {
    collectors: Vec<Box<dyn Collector>>,
    names: HashSet<String>,
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the cluster and query collectors for one Presto endpoint.
    pub fn presto(client: PrestoClient, namespace: &str) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(Box::new(ClusterCollector::new(client.clone(), namespace)?))?;
        registry.register(Box::new(QueryCollector::new(client, namespace)?))?;
        Ok(registry)
    }

    pub fn register(&mut self, collector: Box<dyn Collector>) -> Result<(), RegistryError> {
        let names: Vec<String> = collector
            .describe()
            .iter()
            .map(|d| d.fq_name.clone())
            .collect();
        if let Some(dup) = names.iter().find(|n| self.names.contains(*n)) {
            return Err(RegistryError::Duplicate(dup.clone()));
        }
        self.names.extend(names);
        self.collectors.push(collector);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Runs every collector concurrently and returns their families sorted by name.
    pub async fn gather(&self) -> Vec<MetricFamily> {
        let results = join_all(self.collectors.iter().map(|c| c.collect())).await;
        let mut families: Vec<MetricFamily> = results.into_iter().flatten().collect();
        families.sort_by(|a, b| a.get_name().cmp(b.get_name()));
        families
    }
}
