//! The fixed metric schema.
//!
//! Every process name expands into exactly one value per [`Metric`], grouped
//! into three systems:
//!
//! | system       | subsystems                            |
//! |--------------|---------------------------------------|
//! | `memory`     | used                                  |
//! | `cpu`        | total, user, system                   |
//! | `virtualmem` | peak, size, lock, hwm, rss, swap      |

use std::fmt;

/// Metric family a [`Metric`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum System {
    Memory,
    Cpu,
    VirtualMem,
}

impl System {
    pub const ALL: [System; 3] = [System::Memory, System::Cpu, System::VirtualMem];

    pub fn as_str(self) -> &'static str {
        match self {
            System::Memory => "memory",
            System::Cpu => "cpu",
            System::VirtualMem => "virtualmem",
        }
    }

    /// Metrics of this system, in schema order.
    pub fn metrics(self) -> &'static [Metric] {
        match self {
            System::Memory => &[Metric::MemoryUsed],
            System::Cpu => &[Metric::CpuTotal, Metric::CpuUser, Metric::CpuSystem],
            System::VirtualMem => &[
                Metric::VirtualMemPeak,
                Metric::VirtualMemSize,
                Metric::VirtualMemLock,
                Metric::VirtualMemHwm,
                Metric::VirtualMemRss,
                Metric::VirtualMemSwap,
            ],
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (system, subsystem) pair of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    MemoryUsed,
    CpuTotal,
    CpuUser,
    CpuSystem,
    VirtualMemPeak,
    VirtualMemSize,
    VirtualMemLock,
    VirtualMemHwm,
    VirtualMemRss,
    VirtualMemSwap,
}

impl Metric {
    pub const COUNT: usize = 10;

    /// All metrics in schema order. Also the index order of [`Metric::index`].
    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::MemoryUsed,
        Metric::CpuTotal,
        Metric::CpuUser,
        Metric::CpuSystem,
        Metric::VirtualMemPeak,
        Metric::VirtualMemSize,
        Metric::VirtualMemLock,
        Metric::VirtualMemHwm,
        Metric::VirtualMemRss,
        Metric::VirtualMemSwap,
    ];

    pub fn system(self) -> System {
        match self {
            Metric::MemoryUsed => System::Memory,
            Metric::CpuTotal | Metric::CpuUser | Metric::CpuSystem => System::Cpu,
            Metric::VirtualMemPeak
            | Metric::VirtualMemSize
            | Metric::VirtualMemLock
            | Metric::VirtualMemHwm
            | Metric::VirtualMemRss
            | Metric::VirtualMemSwap => System::VirtualMem,
        }
    }

    /// Subsystem name, exported as the `type` label.
    pub fn subsystem(self) -> &'static str {
        match self {
            Metric::MemoryUsed => "used",
            Metric::CpuTotal => "total",
            Metric::CpuUser => "user",
            Metric::CpuSystem => "system",
            Metric::VirtualMemPeak => "peak",
            Metric::VirtualMemSize => "size",
            Metric::VirtualMemLock => "lock",
            Metric::VirtualMemHwm => "hwm",
            Metric::VirtualMemRss => "rss",
            Metric::VirtualMemSwap => "swap",
        }
    }

    /// Position in [`Metric::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.system(), self.subsystem())
    }
}
