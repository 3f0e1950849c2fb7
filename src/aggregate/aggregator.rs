//! Groups live processes by name and sums their resource usage.

use tracing::trace;

use crate::aggregate::bucket::{Aggregation, ProcessSample};
use crate::collector::source::{EnumerationError, Pid, ProcessSource, ReadError};

/// Runs collection passes against a [`ProcessSource`].
///
/// Holds no state between passes: every call to [`Aggregator::collect`]
/// starts from an empty [`Aggregation`].
pub struct Aggregator<S: ProcessSource> {
    source: S,
}

impl<S: ProcessSource> Aggregator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Enumerates all processes and folds them into per-name buckets.
    ///
    /// Only a failure to list processes fails the pass. Per-process read
    /// failures drop the affected values and are counted in the pass stats.
    pub fn collect(&self) -> Result<Aggregation, EnumerationError> {
        let pids = self.source.pids()?;

        let mut aggregation = Aggregation::new();
        aggregation.set_listed(pids.len());

        for pid in pids {
            match self.sample(pid) {
                Ok(sample) => aggregation.fold(sample),
                Err(e) => {
                    trace!(pid, error = %e, "skipping process without a name");
                    aggregation.skip_unnamed();
                }
            }
        }

        Ok(aggregation)
    }

    /// Reads one process. Fails only when it has no usable name.
    pub fn sample(&self, pid: Pid) -> Result<ProcessSample, ReadError> {
        let name = self.source.name(pid)?;
        if name.is_empty() {
            return Err(ReadError::Parse(pid, "empty process name".to_string()));
        }

        let memory = self.source.memory_info(pid);
        let virtual_memory = self.source.virtual_memory_info(pid);

        // Times are only consulted for processes whose stats are readable.
        let stats = self.source.stats(pid);
        let times = stats.as_ref().ok().map(|_| self.source.times(pid));

        Ok(ProcessSample {
            pid,
            name,
            memory,
            virtual_memory,
            stats,
            times,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::schema::Metric;
    use crate::collector::mock::{MockFs, MockProcess, MockSource};
    use crate::collector::procfs::ProcfsSource;
    use crate::collector::source::VirtualMemoryInfo;

    fn vm(value: u64) -> VirtualMemoryInfo {
        VirtualMemoryInfo {
            peak: value,
            size: value,
            lock: value,
            hwm: value,
            rss: value,
            swap: value,
        }
    }

    #[test]
    fn test_summation_by_name() {
        let source = MockSource::new()
            .with_process(10, MockProcess::named("nginx").with_memory(1000))
            .with_process(11, MockProcess::named("nginx").with_memory(234))
            .with_process(12, MockProcess::named("redis").with_memory(7));

        let aggregation = Aggregator::new(source).collect().unwrap();

        assert_eq!(aggregation.len(), 2);
        assert_eq!(
            aggregation.bucket("nginx").unwrap().get(Metric::MemoryUsed),
            Some(1234.0)
        );
        assert_eq!(
            aggregation.bucket("redis").unwrap().get(Metric::MemoryUsed),
            Some(7.0)
        );
    }

    #[test]
    fn test_enumeration_failure_is_fatal() {
        let aggregator = Aggregator::new(MockSource::failing());

        let err = aggregator.collect().unwrap_err();
        assert!(err.to_string().contains("failed to list processes"));
    }

    #[test]
    fn test_name_skip() {
        let source = MockSource::new()
            .with_process(1, MockProcess::named("bash").with_memory(10))
            .with_process(2, MockProcess::unnamed().with_memory(20))
            .with_process(3, MockProcess::named("").with_memory(30));

        let aggregation = Aggregator::new(source).collect().unwrap();

        assert_eq!(aggregation.len(), 1);
        assert!(aggregation.bucket("").is_none());
        assert_eq!(aggregation.stats().listed, 3);
        assert_eq!(aggregation.stats().unnamed, 2);
    }

    #[test]
    fn test_partial_failure_keeps_other_reads() {
        let source = MockSource::new().with_process(
            1,
            MockProcess::named("postgres")
                .with_virtual_memory(vm(8))
                .with_cpu(1.0, 1.0),
        );

        let aggregation = Aggregator::new(source).collect().unwrap();
        let bucket = aggregation.bucket("postgres").unwrap();

        assert_eq!(bucket.get(Metric::MemoryUsed), None);
        assert_eq!(bucket.get(Metric::VirtualMemSwap), Some(8.0));
        assert_eq!(bucket.get(Metric::CpuTotal), Some(2.0));
        assert_eq!(aggregation.stats().memory_failures, 1);
    }

    #[test]
    fn test_cpu_coupling() {
        let source = MockSource::new()
            .with_process(1, MockProcess::named("java").with_times_only(5.0, 6.0).with_memory(1));

        let aggregator = Aggregator::new(source);
        let aggregation = aggregator.collect().unwrap();
        let bucket = aggregation.bucket("java").unwrap();

        assert_eq!(bucket.get(Metric::CpuUser), None);
        assert_eq!(bucket.get(Metric::CpuSystem), None);
        assert_eq!(bucket.get(Metric::CpuTotal), None);
        assert_eq!(bucket.get(Metric::MemoryUsed), Some(1.0));
        // Times were never read.
        assert_eq!(aggregator.source().times_calls(), 0);
        assert_eq!(aggregation.stats().stats_failures, 1);
    }

    #[test]
    fn test_times_failure_after_stats() {
        let source = MockSource::new().with_process(1, MockProcess::named("java").with_stats_only());

        let aggregator = Aggregator::new(source);
        let aggregation = aggregator.collect().unwrap();

        assert_eq!(aggregator.source().times_calls(), 1);
        assert_eq!(aggregation.stats().times_failures, 1);
        assert_eq!(aggregation.bucket("java").unwrap().populated(), 0);
    }

    #[test]
    fn test_cpu_summation() {
        let source = MockSource::new()
            .with_process(1, MockProcess::named("worker").with_cpu(1.5, 0.5))
            .with_process(2, MockProcess::named("worker").with_cpu(2.0, 1.0));

        let aggregation = Aggregator::new(source).collect().unwrap();
        let bucket = aggregation.bucket("worker").unwrap();

        assert_eq!(bucket.get(Metric::CpuUser), Some(3.5));
        assert_eq!(bucket.get(Metric::CpuSystem), Some(1.5));
        assert_eq!(bucket.get(Metric::CpuTotal), Some(5.0));
    }

    #[test]
    fn test_no_state_between_passes() {
        let source = MockSource::new().with_process(1, MockProcess::named("a").with_memory(5));
        let aggregator = Aggregator::new(source);

        let first = aggregator.collect().unwrap();
        let second = aggregator.collect().unwrap();

        assert_eq!(first.bucket("a"), second.bucket("a"));
        assert_eq!(second.bucket("a").unwrap().get(Metric::MemoryUsed), Some(5.0));
    }

    #[test]
    fn test_procfs_typical_system() {
        let source = ProcfsSource::new(MockFs::typical_system(), "/proc");

        let aggregation = Aggregator::new(source).collect().unwrap();

        assert_eq!(aggregation.len(), 4); // systemd, kthreadd, bash, nginx
        assert_eq!(aggregation.stats().listed, 5);
        assert_eq!(aggregation.stats().failed_reads(), 0);

        let nginx = aggregation.bucket("nginx").unwrap();
        assert_eq!(nginx.get(Metric::MemoryUsed), Some(((250 + 150) * 4096) as f64));
        assert_eq!(nginx.get(Metric::VirtualMemRss), Some(((1000 + 600) * 1024) as f64));
        assert_eq!(nginx.get(Metric::CpuUser), Some(3.0));
        assert_eq!(nginx.get(Metric::CpuSystem), Some(1.5));

        let kthreadd = aggregation.bucket("kthreadd").unwrap();
        assert_eq!(kthreadd.get(Metric::MemoryUsed), Some(0.0));
        assert_eq!(kthreadd.get(Metric::VirtualMemSize), Some(0.0));
    }

    #[test]
    fn test_procfs_vanishing_and_unnamed() {
        let mut fs = MockFs::with_unnamed_process();
        fs.add_dir("/proc/9999");

        let aggregation = Aggregator::new(ProcfsSource::new(fs, "/proc")).collect().unwrap();

        assert_eq!(aggregation.len(), 4);
        assert_eq!(aggregation.stats().listed, 7);
        assert_eq!(aggregation.stats().unnamed, 2);
    }

    #[test]
    fn test_procfs_zombie_has_bucket() {
        let source = ProcfsSource::new(MockFs::with_zombie_process(), "/proc");

        let aggregation = Aggregator::new(source).collect().unwrap();
        let zombie = aggregation.bucket("defunct").unwrap();

        assert_eq!(zombie.get(Metric::MemoryUsed), None);
        assert_eq!(zombie.get(Metric::CpuTotal), Some(0.0));
        assert_eq!(aggregation.stats().memory_failures, 1);
    }
}
