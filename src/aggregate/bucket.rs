//! Per-pass aggregation state: samples, buckets and pass diagnostics.

use std::collections::BTreeMap;

use crate::aggregate::schema::Metric;
use crate::collector::source::{
    CpuTimes, MemoryInfo, Pid, ProcessStats, ReadError, VirtualMemoryInfo,
};

/// Everything read for one named process during a pass.
///
/// Each read is kept as its own `Result` so the fold can account for what
/// failed. `times` is `None` when the stats read failed and times were never
/// attempted.
#[derive(Debug)]
pub struct ProcessSample {
    pub pid: Pid,
    pub name: String,
    pub memory: Result<MemoryInfo, ReadError>,
    pub virtual_memory: Result<VirtualMemoryInfo, ReadError>,
    pub stats: Result<ProcessStats, ReadError>,
    pub times: Option<Result<CpuTimes, ReadError>>,
}

/// Accumulated values for one process name.
///
/// A metric that was never added reads as absent (`get`) or zero (`value`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    values: [Option<f64>; Metric::COUNT],
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the running sum for `metric`.
    pub fn add(&mut self, metric: Metric, value: f64) {
        *self.values[metric.index()].get_or_insert(0.0) += value;
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values[metric.index()]
    }

    /// Accumulated value, 0.0 when nothing was ever added.
    pub fn value(&self, metric: Metric) -> f64 {
        self.get(metric).unwrap_or(0.0)
    }

    /// Number of metrics that received at least one value.
    pub(crate) fn populated(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Failure accounting for one pass. Never part of the exported series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Identifiers returned by enumeration.
    pub listed: usize,
    /// Identifiers skipped because the name was unreadable or empty.
    pub unnamed: usize,
    pub memory_failures: usize,
    pub virtual_memory_failures: usize,
    pub stats_failures: usize,
    pub times_failures: usize,
}

impl PassStats {
    /// Total number of per-process reads that failed, name resolution included.
    pub fn failed_reads(&self) -> usize {
        self.unnamed
            + self.memory_failures
            + self.virtual_memory_failures
            + self.stats_failures
            + self.times_failures
    }
}

/// Result of one aggregation pass: buckets keyed by process name.
///
/// Names are kept sorted, so expansion order is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    buckets: BTreeMap<String, Bucket>,
    stats: PassStats,
}

impl Aggregation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one sample into the bucket of its name.
    ///
    /// The bucket is created even if every read failed, so the name still
    /// expands into a full set of zero-valued records.
    pub fn fold(&mut self, sample: ProcessSample) {
        let bucket = self.buckets.entry(sample.name).or_default();

        match sample.memory {
            Ok(mem) => bucket.add(Metric::MemoryUsed, mem.rss as f64),
            Err(_) => self.stats.memory_failures += 1,
        }

        match sample.virtual_memory {
            Ok(vm) => {
                bucket.add(Metric::VirtualMemPeak, vm.peak as f64);
                bucket.add(Metric::VirtualMemSize, vm.size as f64);
                bucket.add(Metric::VirtualMemLock, vm.lock as f64);
                bucket.add(Metric::VirtualMemHwm, vm.hwm as f64);
                bucket.add(Metric::VirtualMemRss, vm.rss as f64);
                bucket.add(Metric::VirtualMemSwap, vm.swap as f64);
            }
            Err(_) => self.stats.virtual_memory_failures += 1,
        }

        // CPU keys are only touched when the stats read succeeded.
        if sample.stats.is_err() {
            self.stats.stats_failures += 1;
            return;
        }
        match sample.times {
            Some(Ok(times)) => {
                bucket.add(Metric::CpuUser, times.user);
                bucket.add(Metric::CpuSystem, times.system);
                bucket.add(Metric::CpuTotal, times.total());
            }
            Some(Err(_)) => self.stats.times_failures += 1,
            None => {}
        }
    }

    /// Records an identifier that contributed nothing because it had no usable name.
    pub fn skip_unnamed(&mut self) {
        self.stats.unnamed += 1;
    }

    pub(crate) fn set_listed(&mut self, listed: usize) {
        self.stats.listed = listed;
    }

    pub fn buckets(&self) -> &BTreeMap<String, Bucket> {
        &self.buckets
    }

    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    /// Number of distinct process names.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn stats(&self) -> &PassStats {
        &self.stats
    }
}
