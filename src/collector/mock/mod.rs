//! Test doubles for process collection.
//!
//! - `MockFs`: in-memory filesystem with pre-built `/proc` scenarios, for
//!   driving `ProcfsSource` without a real Linux `/proc`.
//! - `MockSource`: scriptable `ProcessSource` with per-read failure injection,
//!   for driving the aggregator directly.

mod filesystem;
mod scenarios;
mod source;

pub use filesystem::MockFs;
pub use source::{MockProcess, MockSource};
