//! Harness work triggered by switching between two resolved configurations.
//!
//! Each kind of work has a list of trigger fields. Changing any field in a
//! list between the old and new configuration requires that work.

use crate::raw::RawConfiguration;
use crate::resolve::ResolvedConfiguration;
use crate::schema::{all_fields, FieldId};

/// Fields whose change requires recreating the input and output buffers.
pub const REBUILD_TRIGGERS: &[FieldId] = &[
    FieldId::InputBufferSizeMb,
    FieldId::InputBufferSizeKb,
    FieldId::InputBufferSizeBytes,
    FieldId::NumThreadGroups,
    FieldId::HeapType,
    FieldId::CpuPageProperty,
    FieldId::MemoryPool,
    FieldId::InputBufferType,
];

/// Fields baked into the compute job at compile time.
pub const RECOMPILE_TRIGGERS: &[FieldId] = &[
    FieldId::InputBufferSizeMb,
    FieldId::InputBufferSizeKb,
    FieldId::InputBufferSizeBytes,
    FieldId::ElemsPerThread,
    FieldId::ThreadElemStride,
    FieldId::GroupElemOffset,
    FieldId::ThreadElemOffset,
    FieldId::InputBufferType,
];

/// Fields whose change requires draining the GPU first, since two queues
/// must never write the same buffer.
pub const FLUSH_TRIGGERS: &[FieldId] = &[FieldId::BufferUploadPath];

/// What changed between two configurations and what the harness must redo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Changed fields, in declaration order.
    pub changed: Vec<FieldId>,
    pub rebuild_buffers: bool,
    pub recompile_job: bool,
    pub flush_queue: bool,
}

impl Transition {
    /// Compares two configurations field by field.
    pub fn between(old: &ResolvedConfiguration, new: &ResolvedConfiguration) -> Self {
        let old_raw = RawConfiguration::from_resolved(old);
        let new_raw = RawConfiguration::from_resolved(new);

        let changed: Vec<FieldId> = all_fields()
            .map(|f| f.id)
            .filter(|id| old_raw.get(id.name()) != new_raw.get(id.name()))
            .collect();
        let triggered = |triggers: &[FieldId]| triggers.iter().any(|id| changed.contains(id));

        let transition = Self {
            rebuild_buffers: triggered(REBUILD_TRIGGERS),
            recompile_job: triggered(RECOMPILE_TRIGGERS),
            flush_queue: triggered(FLUSH_TRIGGERS),
            changed,
        };
        if !transition.is_empty() {
            log::debug!(
                "{} fields changed: rebuild={}, recompile={}, flush={}",
                transition.changed.len(),
                transition.rebuild_buffers,
                transition.recompile_job,
                transition.flush_queue
            );
        }
        transition
    }

    /// Returns true if no field changed.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Returns true if the buffers must be recreated for `new`.
pub fn needs_rebuild(old: &ResolvedConfiguration, new: &ResolvedConfiguration) -> bool {
    Transition::between(old, new).rebuild_buffers
}

/// Returns true if switching from `old` to `new` requires recompiling the
/// compute job.
pub fn needs_recompile(old: &ResolvedConfiguration, new: &ResolvedConfiguration) -> bool {
    Transition::between(old, new).recompile_job
}

/// Returns true if the GPU must be flushed before uploading with `new`.
pub fn needs_queue_flush(old: &ResolvedConfiguration, new: &ResolvedConfiguration) -> bool {
    Transition::between(old, new).flush_queue
}
