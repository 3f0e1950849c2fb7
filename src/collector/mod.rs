//! Process introspection for Linux.
//!
//! The aggregator reads processes through the `ProcessSource` trait. The
//! production implementation walks `/proc` through the `FileSystem` trait, so the
//! same code runs against an in-memory tree in tests and on macOS.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 Aggregator                   │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!                 ┌──────▼────────┐
//!                 │ ProcessSource │ (trait)
//!                 └──────┬────────┘
//!             ┌──────────┴──────────┐
//!      ┌──────▼───────┐      ┌──────▼──────┐
//!      │ ProcfsSource │      │ MockSource  │
//!      │ /proc/[pid]/*│      │ (Testing)   │
//!      └──────┬───────┘      └─────────────┘
//!             │
//!      ┌──────▼──────┐
//!      │ FileSystem  │ (trait)
//!      └──────┬──────┘
//!       ┌─────┴──────┐
//!  ┌────▼───┐   ┌────▼───┐
//!  │ RealFs │   │ MockFs │
//!  └────────┘   └────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use procgauge::collector::{MockFs, ProcessSource, ProcfsSource};
//!
//! let source = ProcfsSource::new(MockFs::typical_system(), "/proc");
//! let pids = source.pids().unwrap();
//! assert_eq!(source.name(pids[0]).unwrap(), "systemd");
//! ```

pub mod mock;
pub mod procfs;
pub mod source;
pub mod traits;

pub use mock::{MockFs, MockProcess, MockSource};
pub use procfs::ProcfsSource;
pub use source::{
    CpuTimes, EnumerationError, MemoryInfo, Pid, ProcessSource, ProcessStats, ReadError,
    VirtualMemoryInfo,
};
pub use traits::{FileSystem, RealFs};
