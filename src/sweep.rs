//! Benchmark sweep generation.
//!
//! A sweep enumerates raw configurations across heap types, buffer sizes
//! and dispatch geometry, skipping combinations the device cannot run.
//! Each entry goes through the resolver like any other request.

use crate::error::ResolutionError;
use crate::raw::RawConfiguration;
use crate::resolve::{resolve, ResolvedConfiguration, MAX_CONSTANT_BUFFER_BYTES};
use crate::schema::FieldId;
use crate::traits::ElementLayout;
use crate::types::{BufferType, CpuPageProperty, HeapType, MemoryPool, SettingEnum};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Largest buffer a sweep entry can express through the MB field.
const MAX_SWEEP_MB: u64 = 256;

/// Device capabilities that restrict which heaps a sweep may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarnessCaps {
    /// The device exposes GPU-upload heaps.
    pub gpu_upload_heap: bool,
    /// Unified memory architecture: a single memory pool.
    pub uma: bool,
}

/// Axes of a benchmark sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    pub heap_types: Vec<HeapType>,
    pub buffer_type: BufferType,
    pub thread_group_counts: Vec<u32>,
    /// Input buffer sizes in bytes.
    pub buffer_sizes: Vec<u64>,
    pub elems_per_thread: Vec<u32>,
    pub thread_elem_strides: Vec<u32>,
    pub group_elem_offsets: Vec<u32>,
    pub thread_elem_offsets: Vec<u32>,
}

impl Default for SweepPlan {
    fn default() -> Self {
        Self {
            heap_types: vec![HeapType::Upload, HeapType::Default, HeapType::GpuUpload],
            buffer_type: BufferType::Raw,
            thread_group_counts: vec![32 * 1024],
            buffer_sizes: vec![32 * MIB, 64 * MIB, 96 * MIB, 128 * MIB],
            elems_per_thread: vec![1],
            thread_elem_strides: vec![1],
            group_elem_offsets: vec![1],
            thread_elem_offsets: vec![1],
        }
    }
}

impl SweepPlan {
    /// Expands the plan into raw configurations, in heap, page property,
    /// pool, group count, size, then geometry order.
    pub fn expand(&self, caps: &HarnessCaps) -> Vec<RawConfiguration> {
        let mut entries = Vec::new();

        for &heap_type in &self.heap_types {
            if heap_type == HeapType::GpuUpload && !caps.gpu_upload_heap {
                log::debug!("skipping {} heap: not supported by device", heap_type);
                continue;
            }

            for (page, pool) in heap_variants(heap_type, caps) {
                for &groups in &self.thread_group_counts {
                    for &size in &self.buffer_sizes {
                        if self.buffer_type == BufferType::Constant
                            && size > MAX_CONSTANT_BUFFER_BYTES
                        {
                            continue;
                        }
                        let Some(size_fields) = size_fields(size) else {
                            log::debug!("skipping {} byte buffer: too large", size);
                            continue;
                        };

                        for &elems in &self.elems_per_thread {
                            for &stride in &self.thread_elem_strides {
                                for &group_offset in &self.group_elem_offsets {
                                    for &thread_offset in &self.thread_elem_offsets {
                                        let mut raw = RawConfiguration::new()
                                            .with(FieldId::HeapType.name(), heap_type.name())
                                            .with(
                                                FieldId::InputBufferType.name(),
                                                self.buffer_type.name(),
                                            )
                                            .with(FieldId::NumThreadGroups.name(), groups)
                                            .with(FieldId::ElemsPerThread.name(), elems)
                                            .with(FieldId::ThreadElemStride.name(), stride)
                                            .with(FieldId::GroupElemOffset.name(), group_offset)
                                            .with(FieldId::ThreadElemOffset.name(), thread_offset)
                                            .with(FieldId::EnableVSync.name(), false);
                                        for (id, value) in size_fields {
                                            raw.set(id.name(), value);
                                        }
                                        if let (Some(page), Some(pool)) = (page, pool) {
                                            raw.set(FieldId::CpuPageProperty.name(), page.name());
                                            raw.set(FieldId::MemoryPool.name(), pool.name());
                                        }
                                        entries.push(raw);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        log::debug!("sweep expanded to {} configurations", entries.len());
        entries
    }
}

/// Page property and pool combinations to try for a heap type. Built-in
/// heaps leave both unset so the resolver supplies the implied values.
fn heap_variants(
    heap_type: HeapType,
    caps: &HarnessCaps,
) -> Vec<(Option<CpuPageProperty>, Option<MemoryPool>)> {
    if heap_type.is_builtin() {
        return vec![(None, None)];
    }

    let mut variants = Vec::new();
    for &page in CpuPageProperty::ALL {
        for &pool in MemoryPool::ALL {
            // UMA devices have only one pool
            if caps.uma && pool == MemoryPool::L1 {
                continue;
            }
            // No cached CPU pages in VRAM on discrete parts
            if !caps.uma && pool == MemoryPool::L1 && page == CpuPageProperty::WriteBack {
                continue;
            }
            variants.push((Some(page), Some(pool)));
        }
    }
    variants
}

/// Splits a byte count into the MB/KB/Bytes input fields.
fn size_fields(size: u64) -> Option<[(FieldId, u32); 3]> {
    let mb = size / MIB;
    if mb > MAX_SWEEP_MB {
        return None;
    }
    let kb = (size % MIB) / KIB;
    let bytes = size % KIB;
    Some([
        (FieldId::InputBufferSizeMb, mb as u32),
        (FieldId::InputBufferSizeKb, kb as u32),
        (FieldId::InputBufferSizeBytes, bytes as u32),
    ])
}

/// Resolves a batch of raw configurations on a pool of worker threads.
///
/// Results are returned in input order. `threads` defaults to the number of
/// logical CPUs.
pub fn resolve_all<L>(
    raws: &[RawConfiguration],
    layout: &L,
    threads: Option<usize>,
) -> Vec<Result<ResolvedConfiguration, ResolutionError>>
where
    L: ElementLayout + Sync + ?Sized,
{
    if raws.is_empty() {
        return Vec::new();
    }

    let num_threads = threads.unwrap_or_else(num_cpus::get).clamp(1, raws.len());
    let chunk_size = raws.len().div_ceil(num_threads);

    crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = raws
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move |_| {
                    chunk
                        .iter()
                        .map(|raw| resolve(raw, layout))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("Resolver thread panicked"))
            .collect()
    })
    .expect("Resolver scope panicked")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawValue;
    use crate::traits::UniformLayout;

    #[test]
    fn test_default_plan_without_gpu_upload() {
        let entries = SweepPlan::default().expand(&HarnessCaps::default());
        // Upload + Default, 4 sizes each
        assert_eq!(entries.len(), 8);
        assert_eq!(entries[0].get("HeapType"), Some(&RawValue::from("Upload")));
        assert_eq!(entries[4].get("HeapType"), Some(&RawValue::from("Default")));
        assert!(entries
            .iter()
            .all(|e| e.get("EnableVSync") == Some(&RawValue::Boolean(false))));
        assert!(entries.iter().all(|e| !e.contains("MemoryPool")));
    }

    #[test]
    fn test_default_plan_with_gpu_upload() {
        let caps = HarnessCaps {
            gpu_upload_heap: true,
            uma: false,
        };
        let entries = SweepPlan::default().expand(&caps);
        assert_eq!(entries.len(), 12);
        assert_eq!(entries[8].get("HeapType"), Some(&RawValue::from("GPUUpload")));
    }

    #[test]
    fn test_size_decomposition() {
        let plan = SweepPlan {
            heap_types: vec![HeapType::Upload],
            buffer_sizes: vec![3 * MIB + 5 * KIB + 7],
            ..Default::default()
        };
        let entries = plan.expand(&HarnessCaps::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].get("InputBufferSizeMB"), Some(&RawValue::Integer(3)));
        assert_eq!(entries[0].get("InputBufferSizeKB"), Some(&RawValue::Integer(5)));
        assert_eq!(entries[0].get("InputBufferSizeBytes"), Some(&RawValue::Integer(7)));

        let config = resolve(&entries[0], &UniformLayout::FLOAT4).unwrap();
        assert_eq!(config.buffer.buffer_size_bytes, 3 * MIB + 5 * KIB + 7);
    }

    #[test]
    fn test_oversized_buffers_skipped() {
        let plan = SweepPlan {
            heap_types: vec![HeapType::Upload],
            buffer_sizes: vec![512 * MIB, 256 * MIB],
            ..Default::default()
        };
        let entries = plan.expand(&HarnessCaps::default());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_constant_buffer_size_limit() {
        let plan = SweepPlan {
            heap_types: vec![HeapType::Upload],
            buffer_type: BufferType::Constant,
            buffer_sizes: vec![16 * KIB, 64 * KIB, MIB],
            ..Default::default()
        };
        assert_eq!(plan.expand(&HarnessCaps::default()).len(), 2);
    }

    #[test]
    fn test_custom_heap_variants_discrete() {
        let plan = SweepPlan {
            heap_types: vec![HeapType::Custom],
            buffer_sizes: vec![MIB],
            ..Default::default()
        };
        let entries = plan.expand(&HarnessCaps::default());
        // 3 page properties x 2 pools, minus (WriteBack, L1)
        assert_eq!(entries.len(), 5);
        assert!(!entries.iter().any(|e| {
            e.get("CPUPageProperty") == Some(&RawValue::from("WriteBack"))
                && e.get("MemoryPool") == Some(&RawValue::from("L1"))
        }));
    }

    #[test]
    fn test_custom_heap_variants_uma() {
        let plan = SweepPlan {
            heap_types: vec![HeapType::Custom],
            buffer_sizes: vec![MIB],
            ..Default::default()
        };
        let caps = HarnessCaps {
            gpu_upload_heap: false,
            uma: true,
        };
        let entries = plan.expand(&caps);
        assert_eq!(entries.len(), 3);
        assert!(entries
            .iter()
            .all(|e| e.get("MemoryPool") == Some(&RawValue::from("L0"))));
    }

    #[test]
    fn test_geometry_axes_multiply() {
        let plan = SweepPlan {
            heap_types: vec![HeapType::Upload],
            thread_group_counts: vec![1, 16],
            buffer_sizes: vec![MIB],
            elems_per_thread: vec![1, 4, 16],
            thread_elem_offsets: vec![0, 1],
            ..Default::default()
        };
        assert_eq!(plan.expand(&HarnessCaps::default()).len(), 12);
    }

    #[test]
    fn test_every_sweep_entry_resolves() {
        let caps = HarnessCaps {
            gpu_upload_heap: true,
            uma: false,
        };
        let mut plan = SweepPlan::default();
        plan.heap_types.push(HeapType::Custom);
        let entries = plan.expand(&caps);

        let results = resolve_all(&entries, &UniformLayout::FLOAT4, Some(3));
        assert_eq!(results.len(), entries.len());
        for result in &results {
            let config = result.as_ref().unwrap();
            assert!(!config.debug.enable_vsync);
            assert_eq!(config.buffer.num_thread_groups, 32 * 1024);
        }
    }

    #[test]
    fn test_resolve_all_preserves_order() {
        let raws: Vec<RawConfiguration> = (0..37)
            .map(|mb| RawConfiguration::new().with("InputBufferSizeMB", mb))
            .collect();
        let results = resolve_all(&raws, &UniformLayout::FLOAT4, Some(4));

        for (mb, result) in results.iter().enumerate() {
            let config = result.as_ref().unwrap();
            assert_eq!(config.buffer.buffer_size_bytes, mb as u64 * MIB);
        }
    }

    #[test]
    fn test_resolve_all_reports_errors_in_place() {
        let raws = vec![
            RawConfiguration::new(),
            RawConfiguration::new().with("HeapType", "Shared"),
            RawConfiguration::new(),
        ];
        let results = resolve_all(&raws, &UniformLayout::FLOAT4, None);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ResolutionError::InvalidEnumValue { .. })
        ));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_resolve_all_empty() {
        assert!(resolve_all(&[], &UniformLayout::FLOAT4, Some(8)).is_empty());
    }
}
