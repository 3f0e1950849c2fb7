//! Process introspection interface consumed by the aggregator.
//!
//! A `ProcessSource` lists the processes running right now and answers
//! independent, individually failable reads for each of them. Nothing read
//! through this trait outlives a single collection pass.

use std::io;

/// Process identifier at enumeration time.
pub type Pid = u32;

/// Resident memory of one process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    /// Resident set size in bytes.
    pub rss: u64,
}

/// Virtual-memory accounting of one process, all values in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualMemoryInfo {
    pub peak: u64,
    pub size: u64,
    pub lock: u64,
    pub hwm: u64,
    pub rss: u64,
    pub swap: u64,
}

/// Per-process scheduler statistics.
///
/// The aggregator only cares whether this read succeeded: CPU times are not
/// accounted for a process whose statistics cannot be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessStats {
    pub state: char,
    pub ppid: u32,
    pub num_threads: i32,
}

/// Cumulative CPU time of one process, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
    /// Time spent waiting for block I/O (delay accounting).
    pub iowait: f64,
}

impl CpuTimes {
    /// Sum of all accounted CPU time.
    pub fn total(&self) -> f64 {
        self.user + self.system + self.iowait
    }
}

/// The process table itself could not be listed.
///
/// This is the only failure that aborts a collection pass.
#[derive(Debug)]
pub struct EnumerationError(io::Error);

impl EnumerationError {
    pub fn new(error: io::Error) -> Self {
        Self(error)
    }
}

impl std::fmt::Display for EnumerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to list processes: {}", self.0)
    }
}

impl std::error::Error for EnumerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<io::Error> for EnumerationError {
    fn from(e: io::Error) -> Self {
        Self(e)
    }
}

/// A single per-process read failed.
#[derive(Debug)]
pub enum ReadError {
    /// Process disappeared, or the requested information does not exist.
    NotFound(Pid),
    /// I/O error other than a missing file (permissions, races).
    Io(Pid, io::Error),
    /// The information was read but could not be parsed.
    Parse(Pid, String),
}

impl ReadError {
    /// Process the failed read was issued for.
    pub fn pid(&self) -> Pid {
        match self {
            ReadError::NotFound(pid) | ReadError::Io(pid, _) | ReadError::Parse(pid, _) => *pid,
        }
    }

    /// Classifies an I/O error for `pid`, folding `NotFound` into a vanished process.
    pub fn from_io(pid: Pid, error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::NotFound {
            ReadError::NotFound(pid)
        } else {
            ReadError::Io(pid, error)
        }
    }
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::NotFound(pid) => write!(f, "process {} not found", pid),
            ReadError::Io(pid, e) => write!(f, "process {}: I/O error: {}", pid, e),
            ReadError::Parse(pid, msg) => write!(f, "process {}: parse error: {}", pid, msg),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Source of per-process resource readings.
///
/// Every method except `pids` may fail independently for a given process;
/// callers decide how much of a failure to absorb.
pub trait ProcessSource: Send + Sync {
    /// Lists the identifiers of all currently running processes.
    fn pids(&self) -> Result<Vec<Pid>, EnumerationError>;

    /// Resolves the process name used as the grouping key.
    fn name(&self, pid: Pid) -> Result<String, ReadError>;

    fn memory_info(&self, pid: Pid) -> Result<MemoryInfo, ReadError>;

    fn virtual_memory_info(&self, pid: Pid) -> Result<VirtualMemoryInfo, ReadError>;

    fn stats(&self, pid: Pid) -> Result<ProcessStats, ReadError>;

    fn times(&self, pid: Pid) -> Result<CpuTimes, ReadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_times_total() {
        let times = CpuTimes {
            user: 1.0,
            system: 2.0,
            iowait: 0.5,
        };
        assert!((times.total() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_read_error_from_io() {
        let gone = ReadError::from_io(7, io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(gone, ReadError::NotFound(7)));

        let denied =
            ReadError::from_io(8, io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(denied, ReadError::Io(8, _)));
        assert_eq!(denied.pid(), 8);
    }

    #[test]
    fn test_error_display() {
        let err = ReadError::Parse(12, "missing ')' in stat".to_string());
        assert_eq!(err.to_string(), "process 12: parse error: missing ')' in stat");

        let err = EnumerationError::new(io::Error::other("boom"));
        assert_eq!(err.to_string(), "failed to list processes: boom");
    }
}
