//! Name-based aggregation of per-process resource usage.
//!
//! One collection pass is [`Aggregator::collect`] followed by [`expand`]:
//!
//! ```
//! use procgauge::aggregate::{expand, Aggregator};
//! use procgauge::collector::{MockProcess, MockSource};
//!
//! let source = MockSource::new()
//!     .with_process(1, MockProcess::named("nginx").with_memory(100))
//!     .with_process(2, MockProcess::named("nginx").with_memory(50));
//!
//! let aggregation = Aggregator::new(source).collect().unwrap();
//! let records: Vec<_> = expand(&aggregation).collect();
//!
//! assert_eq!(records.len(), 10);
//! assert_eq!(records[0].value, 150.0);
//! ```

mod aggregator;
mod bucket;
mod expander;
pub mod schema;

pub use aggregator::Aggregator;
pub use bucket::{Aggregation, Bucket, PassStats, ProcessSample};
pub use expander::{MetricRecord, expand, record_count};
pub use schema::{Metric, System};
