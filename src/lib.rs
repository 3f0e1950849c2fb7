//! procgauge - per-process resource usage aggregated by process name.
//!
//! - `collector` - process introspection (`ProcessSource`, `/proc` reader, test doubles)
//! - `aggregate` - name-keyed aggregation and schema expansion into metric records
//! - `exporter` - Prometheus sink and scrape-driven collector
//!
//! The `procgauged` binary serves the exporter over HTTP.

pub mod aggregate;
pub mod collector;
pub mod exporter;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
