//! Pre-built mock `/proc` scenarios for testing.

use super::filesystem::MockFs;

/// Builds a `/proc/[pid]/stat` line with the fields the source reads filled in.
fn stat_line(pid: u32, comm: &str, state: char, ppid: u32, utime: u64, stime: u64, blkio: u64) -> String {
    format!(
        "{pid} ({comm}) {state} {ppid} {pid} {pid} 0 -1 4194304 100 0 0 0 {utime} {stime} 0 0 20 0 1 0 1000 10000000 500 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 {blkio} 0 0 0 0 0 0 0 0 0 0"
    )
}

/// Builds `/proc/[pid]/status` content. `vm` is `[peak, size, lck, hwm, rss, swap]` in kB;
/// `None` omits the `Vm*` lines, as for kernel threads.
fn status_text(name: &str, pid: u32, ppid: u32, vm: Option<[u64; 6]>) -> String {
    let mut text = format!("Name:\t{name}\nUmask:\t0022\nState:\tS (sleeping)\nPid:\t{pid}\nPPid:\t{ppid}\n");
    if let Some([peak, size, lck, hwm, rss, swap]) = vm {
        text.push_str(&format!(
            "VmPeak:\t{peak:>8} kB\nVmSize:\t{size:>8} kB\nVmLck:\t{lck:>8} kB\nVmHWM:\t{hwm:>8} kB\nVmRSS:\t{rss:>8} kB\nVmSwap:\t{swap:>8} kB\n"
        ));
    }
    text.push_str("Threads:\t1\nvoluntary_ctxt_switches:\t10\n");
    text
}

impl MockFs {
    /// Creates a typical system with a handful of processes.
    ///
    /// | pid  | name     | notes                              |
    /// |------|----------|------------------------------------|
    /// | 1    | systemd  |                                    |
    /// | 2    | kthreadd | kernel thread, no `Vm*`, empty statm |
    /// | 1000 | bash     |                                    |
    /// | 1001 | nginx    | worker                             |
    /// | 1002 | nginx    | worker, same name as 1001          |
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        // System-wide files that must not be mistaken for processes.
        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file("/proc/meminfo", "MemTotal:       16384000 kB\n");

        fs.add_process(
            1,
            &stat_line(1, "systemd", 'S', 0, 500, 300, 0),
            &status_text("systemd", 1, 0, Some([170000, 168000, 0, 12000, 11000, 0])),
            "42000 2750 2000 300 0 5000 0\n",
        );
        fs.add_process(
            2,
            &stat_line(2, "kthreadd", 'S', 0, 0, 12, 0),
            &status_text("kthreadd", 2, 0, None),
            "0 0 0 0 0 0 0\n",
        );
        fs.add_process(
            1000,
            &stat_line(1000, "bash", 'S', 1, 150, 50, 10),
            &status_text("bash", 1000, 1, Some([30000, 25000, 0, 9000, 8000, 16])),
            "6250 2000 500 100 0 1500 0\n",
        );
        fs.add_process(
            1001,
            &stat_line(1001, "nginx", 'S', 1, 200, 100, 0),
            &status_text("nginx", 1001, 1, Some([60000, 55000, 0, 1200, 1000, 0])),
            "13750 250 100 200 0 3000 0\n",
        );
        fs.add_process(
            1002,
            &stat_line(1002, "nginx", 'S', 1, 100, 50, 0),
            &status_text("nginx", 1002, 1, Some([60000, 55000, 0, 800, 600, 0])),
            "13750 150 100 200 0 3000 0\n",
        );

        fs
    }

    /// Creates a system with processes whose names contain spaces and parentheses.
    pub fn with_special_names() -> Self {
        let mut fs = Self::typical_system();

        fs.add_process(
            5000,
            &stat_line(5000, "Web Content", 'S', 4999, 5000, 1000, 0),
            &status_text("Web Content", 5000, 4999, Some([2000000, 1900000, 0, 400000, 350000, 0])),
            "475000 87500 20000 100 0 90000 0\n",
        );
        fs.add_process(
            5001,
            &stat_line(5001, "test(1)", 'S', 1, 10, 5, 0),
            &status_text("test(1)", 5001, 1, Some([10000, 9000, 0, 1000, 900, 0])),
            "2250 225 100 10 0 500 0\n",
        );

        fs
    }

    /// Creates a system with a zombie process (pid 4000): `stat` and `status`
    /// remain but there is no `statm`.
    pub fn with_zombie_process() -> Self {
        let mut fs = Self::typical_system();

        fs.add_process(
            4000,
            &stat_line(4000, "defunct", 'Z', 1000, 0, 0, 0),
            &status_text("defunct", 4000, 1000, None),
            "",
        );

        fs
    }

    /// Creates a system where pid 9999 exited after enumeration: its directory
    /// is still listed but every file read fails.
    pub fn with_vanishing_process() -> Self {
        let mut fs = Self::typical_system();
        fs.add_dir("/proc/9999");
        fs
    }

    /// Creates a system where pid 3000 has an empty name.
    pub fn with_unnamed_process() -> Self {
        let mut fs = Self::typical_system();

        fs.add_process(
            3000,
            &stat_line(3000, "", 'S', 1, 10, 10, 0),
            &status_text("", 3000, 1, Some([100, 100, 0, 10, 10, 0])),
            "25 3 1 1 0 5 0\n",
        );

        fs
    }
}
