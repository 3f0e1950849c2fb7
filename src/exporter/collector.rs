//! Prometheus collector running one aggregation pass per scrape.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use tracing::{debug, error};

use crate::aggregate::{Aggregator, PassStats, expand, record_count};
use crate::collector::source::{EnumerationError, ProcessSource};
use crate::exporter::sink::{MetricSink, PrometheusSink};

/// Error type for a failed scrape.
#[derive(Debug)]
pub enum ScrapeError {
    /// Processes could not be listed; no series for this scrape.
    Enumeration(EnumerationError),
    /// Records could not be turned into metric families.
    Sink(prometheus::Error),
}

impl std::fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeError::Enumeration(e) => write!(f, "{}", e),
            ScrapeError::Sink(e) => write!(f, "building metric families: {}", e),
        }
    }
}

impl std::error::Error for ScrapeError {}

impl From<EnumerationError> for ScrapeError {
    fn from(e: EnumerationError) -> Self {
        ScrapeError::Enumeration(e)
    }
}

impl From<prometheus::Error> for ScrapeError {
    fn from(e: prometheus::Error) -> Self {
        ScrapeError::Sink(e)
    }
}

/// Per-process gauges, registered explicitly into a `prometheus::Registry`.
///
/// Every `collect()` runs a fresh pass: enumerate, aggregate by name, expand
/// against the schema. Concurrent scrapes are serialized.
pub struct ProcessMetrics<S: ProcessSource> {
    aggregator: Aggregator<S>,
    sink: PrometheusSink,
    /// Held for the whole pass; stores the stats of the last successful one.
    last_pass: Mutex<Option<PassStats>>,
}

impl<S: ProcessSource> ProcessMetrics<S> {
    /// Creates the collector. Fails if `namespace` does not form valid metric names.
    pub fn new(source: S, namespace: &str) -> prometheus::Result<Self> {
        Ok(Self {
            aggregator: Aggregator::new(source),
            sink: PrometheusSink::new(namespace)?,
            last_pass: Mutex::new(None),
        })
    }

    /// Diagnostics of the last successful pass, `None` before the first one
    /// or after a failed one.
    pub fn last_pass_stats(&self) -> Option<PassStats> {
        *self.last_pass.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one pass and returns its metric families.
    pub fn scrape(&self) -> Result<Vec<MetricFamily>, ScrapeError> {
        let mut last_pass = self.last_pass.lock().unwrap_or_else(PoisonError::into_inner);
        *last_pass = None;

        let started = Instant::now();
        let aggregation = self.aggregator.collect()?;
        let stats = *aggregation.stats();

        debug!(
            processes = stats.listed,
            names = aggregation.len(),
            records = record_count(&aggregation),
            unnamed = stats.unnamed,
            failed_reads = stats.failed_reads(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "process collection pass finished"
        );

        let families = self.sink.accept(expand(&aggregation))?;
        *last_pass = Some(stats);
        Ok(families)
    }
}

impl<S: ProcessSource> Collector for ProcessMetrics<S> {
    fn desc(&self) -> Vec<&Desc> {
        self.sink.descs().iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        match self.scrape() {
            Ok(families) => families,
            Err(e) => {
                error!(error = %e, "process collection failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, MockProcess, MockSource};
    use crate::collector::procfs::ProcfsSource;
    use prometheus::{Encoder, Registry, TextEncoder};

    fn gauge(families: &[MetricFamily], family: &str, name: &str, kind: &str) -> Option<f64> {
        families
            .iter()
            .find(|f| f.get_name() == family)?
            .get_metric()
            .iter()
            .find(|m| {
                let labels = m.get_label();
                labels.iter().any(|l| l.get_name() == "name" && l.get_value() == name)
                    && labels.iter().any(|l| l.get_name() == "type" && l.get_value() == kind)
            })
            .map(|m| m.get_gauge().get_value())
    }

    #[test]
    fn test_registry_gather() {
        let source = MockSource::new()
            .with_process(1, MockProcess::named("nginx").with_memory(100).with_cpu(1.0, 2.0))
            .with_process(2, MockProcess::named("nginx").with_memory(50))
            .with_process(3, MockProcess::named("sshd"));

        let registry = Registry::new();
        registry
            .register(Box::new(ProcessMetrics::new(source, "node").unwrap()))
            .unwrap();

        let families = registry.gather();
        assert_eq!(families.len(), 3);

        let series: usize = families.iter().map(|f| f.get_metric().len()).sum();
        assert_eq!(series, 2 * 10);

        assert_eq!(gauge(&families, "node_process_memory", "nginx", "used"), Some(150.0));
        assert_eq!(gauge(&families, "node_process_cpu", "nginx", "total"), Some(3.0));
        assert_eq!(gauge(&families, "node_process_virtualmem", "nginx", "hwm"), Some(0.0));
        assert_eq!(gauge(&families, "node_process_cpu", "sshd", "user"), Some(0.0));
    }

    #[test]
    fn test_enumeration_failure_yields_nothing() {
        let metrics = ProcessMetrics::new(MockSource::failing(), "node").unwrap();

        assert!(matches!(metrics.scrape(), Err(ScrapeError::Enumeration(_))));
        assert!(metrics.collect().is_empty());
        assert_eq!(metrics.last_pass_stats(), None);
    }

    #[test]
    fn test_last_pass_stats() {
        let source = MockSource::new()
            .with_process(1, MockProcess::named("a"))
            .with_process(2, MockProcess::unnamed());
        let metrics = ProcessMetrics::new(source, "node").unwrap();
        assert_eq!(metrics.last_pass_stats(), None);

        metrics.scrape().unwrap();

        let stats = metrics.last_pass_stats().unwrap();
        assert_eq!(stats.listed, 2);
        assert_eq!(stats.unnamed, 1);
        assert_eq!(stats.memory_failures, 1);
    }

    #[test]
    fn test_invalid_namespace() {
        assert!(ProcessMetrics::new(MockSource::new(), "no spaces").is_err());
    }

    #[test]
    fn test_text_exposition() {
        let source = ProcfsSource::new(MockFs::typical_system(), "/proc");
        let registry = Registry::new();
        registry
            .register(Box::new(ProcessMetrics::new(source, "node").unwrap()))
            .unwrap();

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("# HELP node_process_memory Labeled per process cpu and memory information."));
        assert!(text.contains("# TYPE node_process_cpu gauge"));
        let sample = |prefix: &str| -> f64 {
            text.lines()
                .find_map(|line| line.strip_prefix(prefix))
                .and_then(|value| value.trim().parse().ok())
                .unwrap()
        };
        assert_eq!(sample(r#"node_process_memory{name="nginx",type="used"} "#), 1638400.0);
        assert_eq!(sample(r#"node_process_cpu{name="bash",type="user"} "#), 1.5);
        assert_eq!(sample(r#"node_process_virtualmem{name="kthreadd",type="size"} "#), 0.0);
    }
}
