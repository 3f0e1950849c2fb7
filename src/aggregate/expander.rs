//! Expands aggregated buckets into schema-complete metric records.

use crate::aggregate::bucket::Aggregation;
use crate::aggregate::schema::{Metric, System};

/// One exported value: `(system, subsystem, process name, value)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRecord<'a> {
    pub metric: Metric,
    pub name: &'a str,
    pub value: f64,
}

impl MetricRecord<'_> {
    pub fn system(&self) -> System {
        self.metric.system()
    }

    pub fn subsystem(&self) -> &'static str {
        self.metric.subsystem()
    }
}

/// Lazily yields one record per (process name, schema metric).
///
/// Names come in lexicographic order and metrics in schema order. Metrics that
/// never received a value are emitted as 0.0, so every name yields exactly
/// [`Metric::COUNT`] records.
pub fn expand(aggregation: &Aggregation) -> impl Iterator<Item = MetricRecord<'_>> + '_ {
    aggregation.buckets().iter().flat_map(|(name, bucket)| {
        Metric::ALL.into_iter().map(move |metric| MetricRecord {
            metric,
            name: name.as_str(),
            value: bucket.value(metric),
        })
    })
}

/// Number of records [`expand`] yields for `aggregation`.
pub fn record_count(aggregation: &Aggregation) -> usize {
    aggregation.len() * Metric::COUNT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregator::Aggregator;
    use crate::collector::mock::{MockProcess, MockSource};

    #[test]
    fn test_empty_aggregation() {
        let aggregation = Aggregation::new();

        assert_eq!(expand(&aggregation).count(), 0);
        assert_eq!(record_count(&aggregation), 0);
    }

    #[test]
    fn test_schema_completeness() {
        let source = MockSource::new()
            .with_process(1, MockProcess::named("a").with_memory(1))
            .with_process(2, MockProcess::named("b"))
            .with_process(3, MockProcess::named("c").with_cpu(1.0, 1.0))
            .with_process(4, MockProcess::named("c"));
        let aggregation = Aggregator::new(source).collect().unwrap();

        let records: Vec<MetricRecord> = expand(&aggregation).collect();

        assert_eq!(records.len(), 3 * 10);
        assert_eq!(records.len(), record_count(&aggregation));
        for name in ["a", "b", "c"] {
            assert_eq!(records.iter().filter(|r| r.name == name).count(), 10);
        }
    }

    #[test]
    fn test_all_zero_name_still_emitted() {
        let source = MockSource::new().with_process(1, MockProcess::named("idle"));
        let aggregation = Aggregator::new(source).collect().unwrap();

        let records: Vec<MetricRecord> = expand(&aggregation).collect();

        assert_eq!(records.len(), 10);
        assert!(records.iter().all(|r| r.value == 0.0));
    }

    #[test]
    fn test_order_is_deterministic() {
        let source = MockSource::new()
            .with_process(1, MockProcess::named("zsh"))
            .with_process(2, MockProcess::named("bash"));
        let aggregation = Aggregator::new(source).collect().unwrap();

        let records: Vec<MetricRecord> = expand(&aggregation).collect();

        assert_eq!(records[0].name, "bash");
        assert_eq!(records[0].metric, Metric::MemoryUsed);
        assert_eq!(records[1].metric, Metric::CpuTotal);
        assert_eq!(records[9].metric, Metric::VirtualMemSwap);
        assert_eq!(records[10].name, "zsh");
    }

    #[test]
    fn test_zero_default_for_failed_virtual_memory() {
        let source = MockSource::new()
            .with_process(1, MockProcess::named("php-fpm").with_memory(10).with_cpu(1.0, 2.0))
            .with_process(2, MockProcess::named("php-fpm").with_memory(5));
        let aggregation = Aggregator::new(source).collect().unwrap();

        let records: Vec<MetricRecord> = expand(&aggregation).collect();

        for record in records.iter().filter(|r| r.system() == System::VirtualMem) {
            assert_eq!(record.value, 0.0, "{}", record.metric);
        }
        let memory = records.iter().find(|r| r.metric == Metric::MemoryUsed).unwrap();
        assert_eq!(memory.value, 15.0);
    }

    #[test]
    fn test_nginx_end_to_end() {
        let source = MockSource::new()
            .with_process(100, MockProcess::named("nginx").with_memory(100).with_cpu(1.0, 2.0))
            .with_process(101, MockProcess::named("nginx").with_memory(50));
        let aggregation = Aggregator::new(source).collect().unwrap();

        let records: Vec<MetricRecord> = expand(&aggregation).collect();
        assert_eq!(records.len(), 10);

        let value = |system: &str, subsystem: &str| -> f64 {
            records
                .iter()
                .find(|r| r.system().as_str() == system && r.subsystem() == subsystem)
                .map(|r| r.value)
                .unwrap()
        };
        assert_eq!(value("memory", "used"), 150.0);
        assert_eq!(value("cpu", "user"), 1.0);
        assert_eq!(value("cpu", "system"), 2.0);
        assert_eq!(value("cpu", "total"), 3.0);
        for sub in ["peak", "size", "lock", "hwm", "rss", "swap"] {
            assert_eq!(value("virtualmem", sub), 0.0);
        }
    }
}
