//! Prometheus exposition of aggregated process metrics.
//!
//! [`ProcessMetrics`] is a `prometheus::core::Collector`: the host registers it
//! into its own `Registry`, and each gather runs one collection pass.
//!
//! ```
//! use procgauge::collector::{MockFs, ProcfsSource};
//! use procgauge::exporter::ProcessMetrics;
//! use prometheus::Registry;
//!
//! let source = ProcfsSource::new(MockFs::typical_system(), "/proc");
//! let registry = Registry::new();
//! registry
//!     .register(Box::new(ProcessMetrics::new(source, "node").unwrap()))
//!     .unwrap();
//!
//! let families = registry.gather();
//! assert_eq!(families[0].get_name(), "node_process_cpu");
//! ```

mod collector;
mod sink;

pub use collector::{ProcessMetrics, ScrapeError};
pub use sink::{HELP, MetricSink, PrometheusSink};
