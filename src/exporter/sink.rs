//! Metric sinks: where expanded records end up.

use std::collections::HashMap;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};

use crate::aggregate::{MetricRecord, System};

/// Help text shared by all exported families.
pub const HELP: &str = "Labeled per process cpu and memory information.";

/// Label names, in `with_label_values` order.
const LABELS: [&str; 2] = ["name", "type"];

/// Consumer of one pass worth of records.
pub trait MetricSink {
    type Output;

    fn accept<'a, I>(&self, records: I) -> Self::Output
    where
        I: IntoIterator<Item = MetricRecord<'a>>;
}

/// Joins the non-empty parts of a metric name with `_`.
fn fq_name(namespace: &str, system: System) -> String {
    [namespace, "process", system.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Turns records into Prometheus gauge families named
/// `<namespace>_process_<system>` with `name` and `type` labels.
#[derive(Debug)]
pub struct PrometheusSink {
    namespace: String,
    descs: Vec<Desc>,
}

impl PrometheusSink {
    /// Fails if `namespace` does not form valid metric names.
    pub fn new(namespace: impl Into<String>) -> prometheus::Result<Self> {
        let namespace = namespace.into();
        let descs = System::ALL
            .iter()
            .map(|&system| {
                Desc::new(
                    fq_name(&namespace, system),
                    HELP.to_string(),
                    LABELS.iter().map(|l| l.to_string()).collect(),
                    HashMap::new(),
                )
            })
            .collect::<prometheus::Result<Vec<_>>>()?;

        Ok(Self { namespace, descs })
    }

    /// Fully qualified family name for `system`.
    pub fn family_name(&self, system: System) -> String {
        fq_name(&self.namespace, system)
    }

    /// Descriptors of the families this sink produces, in `System::ALL` order.
    pub fn descs(&self) -> &[Desc] {
        &self.descs
    }

    /// Fresh, empty gauge vectors, one per system in `System::ALL` order.
    fn gauge_vecs(&self) -> prometheus::Result<Vec<GaugeVec>> {
        System::ALL
            .iter()
            .map(|&system| GaugeVec::new(Opts::new(self.family_name(system), HELP), &LABELS))
            .collect()
    }
}

impl MetricSink for PrometheusSink {
    type Output = prometheus::Result<Vec<MetricFamily>>;

    fn accept<'a, I>(&self, records: I) -> Self::Output
    where
        I: IntoIterator<Item = MetricRecord<'a>>,
    {
        let vecs = self.gauge_vecs()?;
        for record in records {
            vecs[record.system() as usize]
                .with_label_values(&[record.name, record.subsystem()])
                .set(record.value);
        }

        Ok(vecs
            .iter()
            .flat_map(|v| v.collect())
            .filter(|family| !family.get_metric().is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Metric;

    fn record(metric: Metric, name: &str, value: f64) -> MetricRecord<'_> {
        MetricRecord {
            metric,
            name,
            value,
        }
    }

    #[test]
    fn test_family_names() {
        let sink = PrometheusSink::new("node").unwrap();
        assert_eq!(sink.family_name(System::Memory), "node_process_memory");
        assert_eq!(sink.family_name(System::VirtualMem), "node_process_virtualmem");
        assert_eq!(sink.descs().len(), 3);

        let bare = PrometheusSink::new("").unwrap();
        assert_eq!(bare.family_name(System::Cpu), "process_cpu");
    }

    #[test]
    fn test_invalid_namespace() {
        assert!(PrometheusSink::new("bad-namespace").is_err());
        assert!(PrometheusSink::new("1node").is_err());
    }

    #[test]
    fn test_accept_builds_gauges() {
        let sink = PrometheusSink::new("node").unwrap();
        let families = sink
            .accept(vec![
                record(Metric::MemoryUsed, "nginx", 150.0),
                record(Metric::CpuUser, "nginx", 1.0),
                record(Metric::CpuSystem, "nginx", 2.0),
            ])
            .unwrap();

        // No virtualmem records, so no virtualmem family.
        assert_eq!(families.len(), 2);

        let memory = &families[0];
        assert_eq!(memory.get_name(), "node_process_memory");
        assert_eq!(memory.get_help(), HELP);
        assert_eq!(memory.get_metric().len(), 1);

        let metric = &memory.get_metric()[0];
        let labels: Vec<(&str, &str)> = metric
            .get_label()
            .iter()
            .map(|l| (l.get_name(), l.get_value()))
            .collect();
        assert_eq!(labels, vec![("name", "nginx"), ("type", "used")]);
        assert_eq!(metric.get_gauge().get_value(), 150.0);

        assert_eq!(families[1].get_name(), "node_process_cpu");
        assert_eq!(families[1].get_metric().len(), 2);
    }

    #[test]
    fn test_accept_empty() {
        let sink = PrometheusSink::new("node").unwrap();
        assert!(sink.accept(Vec::<MetricRecord>::new()).unwrap().is_empty());
    }
}
