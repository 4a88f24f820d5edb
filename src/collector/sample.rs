// Metric descriptors and per-scrape sample sets built on the prometheus proto types

use prometheus::core::Desc;
use prometheus::proto::{Counter, Gauge, LabelPair, Metric, MetricFamily, MetricType};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Gauge,
    Counter,
}

impl From<ValueType> for MetricType {
    fn from(v: ValueType) -> Self {
        match v {
            ValueType::Gauge => MetricType::GAUGE,
            ValueType::Counter => MetricType::COUNTER,
        }
    }
}

/// `namespace_subsystem_name`, skipping empty parts.
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// A validated metric descriptor plus the type its samples are emitted with.
/// Built once per collector and reused for every scrape.
#[derive(Debug, Clone)]
pub struct MetricDesc {
    desc: Desc,
    value_type: ValueType,
}

impl MetricDesc {
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        value_type: ValueType,
        labels: &[&str],
    ) -> prometheus::Result<Self> {
        let desc = Desc::new(
            fq_name(namespace, subsystem, name),
            help.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?;
        Ok(Self { desc, value_type })
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.fq_name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

/// Samples assembled during one scrape, grouped into one family per descriptor.
#[derive(Debug, Default)]
pub struct Samples {
    families: Vec<MetricFamily>,
}

impl Samples {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one sample. `label_values` pair up with the descriptor's labels in order.
    pub fn push(&mut self, desc: &MetricDesc, value: f64, label_values: &[&str]) {
        debug_assert_eq!(
            label_values.len(),
            desc.desc.variable_labels.len(),
            "label values for {}",
            desc.name()
        );

        let mut metric = Metric::default();
        for pair in &desc.desc.const_label_pairs {
            metric.mut_label().push(pair.clone());
        }
        for (name, value) in desc.desc.variable_labels.iter().zip(label_values) {
            let mut pair = LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.to_string());
            metric.mut_label().push(pair);
        }
        match desc.value_type {
            ValueType::Gauge => {
                let mut g = Gauge::default();
                g.set_value(value);
                metric.set_gauge(g);
            }
            ValueType::Counter => {
                let mut c = Counter::default();
                c.set_value(value);
                metric.set_counter(c);
            }
        }

        self.family_mut(desc).mut_metric().push(metric);
    }

    fn family_mut(&mut self, desc: &MetricDesc) -> &mut MetricFamily {
        let pos = match self
            .families
            .iter()
            .position(|f| f.get_name() == desc.name())
        {
            Some(pos) => pos,
            None => {
                let mut family = MetricFamily::default();
                family.set_name(desc.name().to_string());
                family.set_help(desc.desc.help.clone());
                family.set_field_type(desc.value_type.into());
                self.families.push(family);
                self.families.len() - 1
            }
        };
        &mut self.families[pos]
    }

    /// Total number of samples across all families.
    pub fn len(&self) -> usize {
        self.families.iter().map(|f| f.get_metric().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn into_families(self) -> Vec<MetricFamily> {
        self.families
    }
}
