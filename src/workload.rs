//! Workload figures derived from a resolved configuration.
//!
//! These are the numbers the harness reports alongside its timings:
//! dispatch size, bytes touched, and whether the input buffer is written
//! by the CPU directly or staged through an upload queue.

use crate::resolve::ResolvedConfiguration;

/// Threads per thread group in the compute job.
pub const THREAD_GROUP_SIZE: u64 = 256;

/// Bytes read by one element load (a float4).
pub const BYTES_PER_LOAD: u64 = 16;

const MIB: f64 = 1024.0 * 1024.0;

/// Read-only figures describing the dispatch a configuration produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadFigures {
    pub total_threads: u64,
    pub cpu_writable: bool,
    /// The harness must stage the input through an upload buffer.
    pub needs_upload_staging: bool,
    /// The harness also reads the input buffer back on the CPU.
    pub reads_back: bool,
    /// Bytes loaded by the whole dispatch.
    pub bytes_read: u64,
    /// Distinct bytes loaded, bounded by the input buffer size.
    pub unique_bytes_read: u64,
}

impl WorkloadFigures {
    pub fn from_config(config: &ResolvedConfiguration) -> Self {
        let buffer = &config.buffer;
        let num_groups = u64::from(buffer.num_thread_groups);
        let elems_per_thread = u64::from(buffer.elems_per_thread);

        let total_threads = THREAD_GROUP_SIZE * num_groups;
        let bytes_read = elems_per_thread * BYTES_PER_LOAD * total_threads;

        let threads_with_unique_data = if buffer.thread_elem_offset > 0 {
            THREAD_GROUP_SIZE
        } else {
            1
        };
        let groups_with_unique_data = if buffer.group_elem_offset > 0 {
            num_groups
        } else {
            1
        };
        let unique_bytes_per_group = elems_per_thread * BYTES_PER_LOAD * threads_with_unique_data;
        let unique_bytes_read =
            (unique_bytes_per_group * groups_with_unique_data).min(buffer.buffer_size_bytes);

        let cpu_writable = config.heap.is_cpu_writable();

        Self {
            total_threads,
            cpu_writable,
            needs_upload_staging: !cpu_writable,
            reads_back: cpu_writable && config.transfer.read_from_gpu_mem,
            bytes_read,
            unique_bytes_read,
        }
    }

    /// Effective read bandwidth in MiB/s for a measured GPU time.
    ///
    /// Returns `None` for a non-positive or non-finite time.
    pub fn effective_bandwidth_mib_per_s(&self, gpu_time_ms: f64) -> Option<f64> {
        if !gpu_time_ms.is_finite() || gpu_time_ms <= 0.0 {
            return None;
        }
        Some((self.bytes_read as f64 / MIB) / (gpu_time_ms / 1000.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawConfiguration;
    use crate::resolve::resolve;
    use crate::traits::UniformLayout;

    fn figures(raw: RawConfiguration) -> WorkloadFigures {
        let config = resolve(&raw, &UniformLayout::FLOAT4).unwrap();
        WorkloadFigures::from_config(&config)
    }

    #[test]
    fn test_default_figures() {
        let f = figures(RawConfiguration::new());
        assert_eq!(f.total_threads, 256 * 4096);
        assert_eq!(f.bytes_read, 16 * 256 * 4096);
        // 16 MiB read in full, buffer is 16 MiB.
        assert_eq!(f.unique_bytes_read, 16 * 1024 * 1024);
        assert!(f.cpu_writable);
        assert!(!f.needs_upload_staging);
        assert!(!f.reads_back);
    }

    #[test]
    fn test_unique_bytes_without_offsets() {
        let f = figures(
            RawConfiguration::new()
                .with("ThreadElemOffset", 0)
                .with("GroupElemOffset", 0)
                .with("ElemsPerThread", 4),
        );
        assert_eq!(f.unique_bytes_read, 4 * 16);
        assert_eq!(f.bytes_read, 4 * 16 * 256 * 4096);
    }

    #[test]
    fn test_unique_bytes_bounded_by_buffer() {
        let f = figures(
            RawConfiguration::new()
                .with("InputBufferSizeMB", 0)
                .with("InputBufferSizeKB", 1),
        );
        assert_eq!(f.unique_bytes_read, 1024);
    }

    #[test]
    fn test_default_heap_needs_staging() {
        let f = figures(
            RawConfiguration::new()
                .with("HeapType", "Default")
                .with("ReadFromGPUMem", true),
        );
        assert!(!f.cpu_writable);
        assert!(f.needs_upload_staging);
        assert!(!f.reads_back);
    }

    #[test]
    fn test_reads_back_when_cpu_writable() {
        let f = figures(RawConfiguration::new().with("ReadFromGPUMem", true));
        assert!(f.reads_back);
    }

    #[test]
    fn test_effective_bandwidth() {
        let f = figures(
            RawConfiguration::new()
                .with("NumThreadGroups", 256)
                .with("ElemsPerThread", 1),
        );
        // 256 groups * 256 threads * 16 bytes = 1 MiB
        assert_eq!(f.bytes_read, 1024 * 1024);
        let bw = f.effective_bandwidth_mib_per_s(1.0).unwrap();
        assert!((bw - 1000.0).abs() < 1e-9);
        assert!(f.effective_bandwidth_mib_per_s(0.0).is_none());
        assert!(f.effective_bandwidth_mib_per_s(-3.0).is_none());
        assert!(f.effective_bandwidth_mib_per_s(f64::NAN).is_none());
    }
}
