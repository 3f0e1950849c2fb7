//! Parsers for per-process `/proc/[pid]/*` files.
//!
//! Pure functions over file contents, testable with string inputs.

use std::collections::HashMap;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Fields of `/proc/[pid]/stat` used by the process source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    /// User time in clock ticks.
    pub utime: u64,
    /// System time in clock ticks.
    pub stime: u64,
    pub num_threads: i32,
    pub starttime: u64,
    /// Aggregated block I/O delay in clock ticks (0 without delay accounting).
    pub delayacct_blkio_ticks: u64,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The comm field is enclosed in parentheses and may itself contain spaces
/// and parentheses, so fields are located relative to the last `)`.
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;
    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: u32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;
    let comm = content[open_paren + 1..close_paren].to_string();

    // Indices below are relative to the first field after comm (state = 0).
    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() < 22 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 22+, got {}",
            fields.len()
        )));
    }

    let field = |idx: usize, name: &str| -> Result<i64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };
    let field_u64 = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(ProcStat {
        pid,
        comm,
        state: fields[0].chars().next().unwrap_or('?'),
        ppid: field(1, "ppid")? as u32,
        utime: field_u64(11, "utime")?,
        stime: field_u64(12, "stime")?,
        num_threads: field(17, "num_threads")? as i32,
        starttime: field_u64(19, "starttime")?,
        // Older kernels stop before this field.
        delayacct_blkio_ticks: fields.get(39).and_then(|s| s.parse().ok()).unwrap_or(0),
    })
}

/// Fields of `/proc/[pid]/status` used by the process source.
///
/// Memory values are in kB, as printed by the kernel. Kernel threads have no
/// `Vm*` lines; those fields stay 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStatus {
    pub name: String,
    pub vm_peak: u64,
    pub vm_size: u64,
    pub vm_lck: u64,
    pub vm_hwm: u64,
    pub vm_rss: u64,
    pub vm_swap: u64,
}

/// Parses `/proc/[pid]/status` content.
///
/// Format is `key:\tvalue` pairs, one per line.
pub fn parse_proc_status(content: &str) -> Result<ProcStatus, ParseError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim(), value.trim());
        }
    }

    let name = fields
        .get("Name")
        .ok_or_else(|| ParseError::new("missing Name in status"))?;

    // "12345 kB"
    let parse_kb = |key: &str| -> u64 {
        fields
            .get(key)
            .and_then(|s| s.split_whitespace().next())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    };

    Ok(ProcStatus {
        name: name.to_string(),
        vm_peak: parse_kb("VmPeak"),
        vm_size: parse_kb("VmSize"),
        vm_lck: parse_kb("VmLck"),
        vm_hwm: parse_kb("VmHWM"),
        vm_rss: parse_kb("VmRSS"),
        vm_swap: parse_kb("VmSwap"),
    })
}

/// Parsed `/proc/[pid]/statm`, all values in pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcStatm {
    pub size: u64,
    pub resident: u64,
    pub shared: u64,
}

/// Parses `/proc/[pid]/statm` content: `size resident shared text lib data dt`.
pub fn parse_proc_statm(content: &str) -> Result<ProcStatm, ParseError> {
    let mut fields = content.split_whitespace();
    let mut next = |name: &str| -> Result<u64, ParseError> {
        fields
            .next()
            .ok_or_else(|| ParseError::new(format!("missing field {} in statm", name)))?
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {} in statm", name)))
    };

    Ok(ProcStatm {
        size: next("size")?,
        resident: next("resident")?,
        shared: next("shared")?,
    })
}
