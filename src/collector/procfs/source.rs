//! `ProcessSource` backed by the Linux `/proc` filesystem.

use std::path::Path;

use crate::collector::procfs::parser::{parse_proc_stat, parse_proc_statm, parse_proc_status};
use crate::collector::source::{
    CpuTimes, EnumerationError, MemoryInfo, Pid, ProcessSource, ProcessStats, ReadError,
    VirtualMemoryInfo,
};
use crate::collector::traits::FileSystem;

/// Clock ticks per second (USER_HZ). Standard value for Linux.
const CLK_TCK: f64 = 100.0;

/// Default memory page size in bytes.
const PAGE_SIZE: u64 = 4096;

/// Reads process information from `/proc/[pid]/` files.
///
/// | read                  | file              |
/// |-----------------------|-------------------|
/// | name                  | `status` (`Name`) |
/// | memory                | `statm`           |
/// | virtual memory        | `status` (`Vm*`)  |
/// | stats, times          | `stat`            |
pub struct ProcfsSource<F: FileSystem> {
    fs: F,
    proc_path: String,
    page_size: u64,
}

impl<F: FileSystem> ProcfsSource<F> {
    /// Creates a new procfs source.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            page_size: PAGE_SIZE,
        }
    }

    /// Overrides the page size used to convert `statm` pages into bytes.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    fn read(&self, pid: Pid, file: &str) -> Result<String, ReadError> {
        let path = format!("{}/{}/{}", self.proc_path, pid, file);
        self.fs
            .read_to_string(Path::new(&path))
            .map_err(|e| ReadError::from_io(pid, e))
    }
}

impl<F: FileSystem> ProcessSource for ProcfsSource<F> {
    fn pids(&self) -> Result<Vec<Pid>, EnumerationError> {
        let entries = self.fs.read_dir(Path::new(&self.proc_path))?;

        // Only numeric entries are process directories.
        let mut pids: Vec<Pid> = entries
            .iter()
            .filter_map(|entry| entry.file_name().and_then(|n| n.to_str()))
            .filter_map(|name| name.parse::<Pid>().ok())
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }

    fn name(&self, pid: Pid) -> Result<String, ReadError> {
        let content = self.read(pid, "status")?;
        let status = parse_proc_status(&content).map_err(|e| ReadError::Parse(pid, e.message))?;
        Ok(status.name)
    }

    fn memory_info(&self, pid: Pid) -> Result<MemoryInfo, ReadError> {
        let content = self.read(pid, "statm")?;
        let statm = parse_proc_statm(&content).map_err(|e| ReadError::Parse(pid, e.message))?;
        Ok(MemoryInfo {
            rss: statm.resident * self.page_size,
        })
    }

    fn virtual_memory_info(&self, pid: Pid) -> Result<VirtualMemoryInfo, ReadError> {
        let content = self.read(pid, "status")?;
        let status = parse_proc_status(&content).map_err(|e| ReadError::Parse(pid, e.message))?;

        // status reports kB
        Ok(VirtualMemoryInfo {
            peak: status.vm_peak * 1024,
            size: status.vm_size * 1024,
            lock: status.vm_lck * 1024,
            hwm: status.vm_hwm * 1024,
            rss: status.vm_rss * 1024,
            swap: status.vm_swap * 1024,
        })
    }

    fn stats(&self, pid: Pid) -> Result<ProcessStats, ReadError> {
        let content = self.read(pid, "stat")?;
        let stat = parse_proc_stat(&content).map_err(|e| ReadError::Parse(pid, e.message))?;
        Ok(ProcessStats {
            state: stat.state,
            ppid: stat.ppid,
            num_threads: stat.num_threads,
        })
    }

    fn times(&self, pid: Pid) -> Result<CpuTimes, ReadError> {
        let content = self.read(pid, "stat")?;
        let stat = parse_proc_stat(&content).map_err(|e| ReadError::Parse(pid, e.message))?;
        Ok(CpuTimes {
            user: stat.utime as f64 / CLK_TCK,
            system: stat.stime as f64 / CLK_TCK,
            iowait: stat.delayacct_blkio_ticks as f64 / CLK_TCK,
        })
    }
}
