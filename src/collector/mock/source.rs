//! Scriptable `ProcessSource` for aggregator tests.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::collector::source::{
    CpuTimes, EnumerationError, MemoryInfo, Pid, ProcessSource, ProcessStats, ReadError,
    VirtualMemoryInfo,
};

/// Canned answers for one process. `None` makes the corresponding read fail.
#[derive(Debug, Clone, Default)]
pub struct MockProcess {
    pub name: Option<String>,
    pub memory: Option<MemoryInfo>,
    pub virtual_memory: Option<VirtualMemoryInfo>,
    pub stats: Option<ProcessStats>,
    pub times: Option<CpuTimes>,
}

impl MockProcess {
    /// A process with a name and every other read failing.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A process whose name cannot be resolved.
    pub fn unnamed() -> Self {
        Self::default()
    }

    pub fn with_memory(mut self, rss: u64) -> Self {
        self.memory = Some(MemoryInfo { rss });
        self
    }

    pub fn with_virtual_memory(mut self, vm: VirtualMemoryInfo) -> Self {
        self.virtual_memory = Some(vm);
        self
    }

    /// Successful stats and times reads.
    pub fn with_cpu(mut self, user: f64, system: f64) -> Self {
        self.stats = Some(ProcessStats::default());
        self.times = Some(CpuTimes {
            user,
            system,
            iowait: 0.0,
        });
        self
    }

    /// Times would be readable, but the stats read fails.
    pub fn with_times_only(mut self, user: f64, system: f64) -> Self {
        self.stats = None;
        self.times = Some(CpuTimes {
            user,
            system,
            iowait: 0.0,
        });
        self
    }

    /// Stats readable, times read fails.
    pub fn with_stats_only(mut self) -> Self {
        self.stats = Some(ProcessStats::default());
        self.times = None;
        self
    }
}

/// In-memory process table with per-read failure injection.
#[derive(Debug, Default)]
pub struct MockSource {
    processes: BTreeMap<Pid, MockProcess>,
    fail_enumeration: bool,
    times_calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose process listing always fails.
    pub fn failing() -> Self {
        Self {
            fail_enumeration: true,
            ..Self::default()
        }
    }

    pub fn with_process(mut self, pid: Pid, process: MockProcess) -> Self {
        self.processes.insert(pid, process);
        self
    }

    /// Number of `times` reads issued so far.
    pub fn times_calls(&self) -> usize {
        self.times_calls.load(Ordering::Relaxed)
    }

    fn process(&self, pid: Pid) -> Result<&MockProcess, ReadError> {
        self.processes.get(&pid).ok_or(ReadError::NotFound(pid))
    }
}

fn unreadable(pid: Pid) -> ReadError {
    ReadError::Io(
        pid,
        io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
    )
}

impl ProcessSource for MockSource {
    fn pids(&self) -> Result<Vec<Pid>, EnumerationError> {
        if self.fail_enumeration {
            return Err(EnumerationError::new(io::Error::other(
                "process table unavailable",
            )));
        }
        Ok(self.processes.keys().copied().collect())
    }

    fn name(&self, pid: Pid) -> Result<String, ReadError> {
        self.process(pid)?
            .name
            .clone()
            .ok_or(ReadError::NotFound(pid))
    }

    fn memory_info(&self, pid: Pid) -> Result<MemoryInfo, ReadError> {
        self.process(pid)?.memory.ok_or_else(|| unreadable(pid))
    }

    fn virtual_memory_info(&self, pid: Pid) -> Result<VirtualMemoryInfo, ReadError> {
        self.process(pid)?
            .virtual_memory
            .ok_or_else(|| unreadable(pid))
    }

    fn stats(&self, pid: Pid) -> Result<ProcessStats, ReadError> {
        self.process(pid)?.stats.clone().ok_or_else(|| unreadable(pid))
    }

    fn times(&self, pid: Pid) -> Result<CpuTimes, ReadError> {
        self.times_calls.fetch_add(1, Ordering::Relaxed);
        self.process(pid)?.times.ok_or_else(|| unreadable(pid))
    }
}
