//! Configuration resolver.
//!
//! Turns a sparse [`RawConfiguration`] into one internally consistent
//! [`ResolvedConfiguration`] the harness can consume without further
//! interpretation. Resolution is a pure function: no shared state, no I/O,
//! and identical input always yields a value-equal result.
//!
//! Steps, in order:
//! 1. defaulting (unknown names are rejected here)
//! 2. enum validation
//! 3. numeric clamping
//! 4. heap compatibility check
//! 5. buffer size collapse
//! 6. element count derivation
//! 7. thread geometry pass-through
//! 8. background upload bounds
//! 9. runtime index reset

use crate::error::ResolutionError;
use crate::raw::{parse_integer, RawConfiguration, RawValue};
use crate::schema::{Domain, FieldId, FieldKind, FieldValue, FIELDS, FIELD_COUNT};
use crate::traits::ElementLayout;
use crate::types::{
    BufferType, BufferUploadPath, CpuPageProperty, HeapType, MemoryPool, SettingEnum,
};
use std::time::Duration;

/// Sentinel for a buffer index the harness has not assigned yet.
pub const UNASSIGNED_INDEX: i32 = -1;

/// Largest constant buffer the harness can bind (4096 float4 constants).
pub const MAX_CONSTANT_BUFFER_BYTES: u64 = 4096 * 16;

/// Placement alignment of constant buffers.
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// Largest non-constant input buffer the harness allocates.
pub const MAX_INPUT_BUFFER_BYTES: u64 = 1024 * 1024 * 1024;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Heap type with its CPU page property and memory pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapSelection {
    pub heap_type: HeapType,
    pub cpu_page_property: CpuPageProperty,
    pub memory_pool: MemoryPool,
}

impl HeapSelection {
    /// Returns the page property and pool a built-in heap type implies, or
    /// `None` for `Custom`.
    pub fn implied_by(heap_type: HeapType) -> Option<(CpuPageProperty, MemoryPool)> {
        match heap_type {
            HeapType::Upload | HeapType::GpuUpload => {
                Some((CpuPageProperty::WriteCombine, MemoryPool::L0))
            }
            HeapType::Default => Some((CpuPageProperty::NotAvailable, MemoryPool::L1)),
            HeapType::Custom => None,
        }
    }

    /// Checks the heap compatibility rule.
    ///
    /// Upload and GPU-upload heaps need a host-reachable pool and some CPU
    /// access; default heaps need no CPU access and device-local memory.
    /// Custom heaps are an explicit override and always pass.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError::IncompatibleHeapSelection` with the
    /// offending triple.
    pub fn validate(&self) -> Result<(), ResolutionError> {
        let compatible = match self.heap_type {
            HeapType::Upload | HeapType::GpuUpload => {
                self.memory_pool == MemoryPool::L0
                    && self.cpu_page_property != CpuPageProperty::NotAvailable
            }
            HeapType::Default => {
                self.cpu_page_property == CpuPageProperty::NotAvailable
                    && self.memory_pool == MemoryPool::L1
            }
            HeapType::Custom => true,
        };

        if compatible {
            Ok(())
        } else {
            Err(ResolutionError::IncompatibleHeapSelection {
                heap_type: self.heap_type,
                cpu_page_property: self.cpu_page_property,
                memory_pool: self.memory_pool,
            })
        }
    }

    /// Returns true if host code can write the input buffer directly.
    pub fn is_cpu_writable(&self) -> bool {
        match self.heap_type {
            HeapType::Upload | HeapType::GpuUpload => true,
            HeapType::Custom => self.cpu_page_property != CpuPageProperty::NotAvailable,
            HeapType::Default => false,
        }
    }
}

/// The clamped mixed-unit size fields, as supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferSizeComponents {
    pub mb: u32,
    pub kb: u32,
    pub bytes: u32,
}

impl BufferSizeComponents {
    /// Collapses the three units into one byte count.
    pub fn total_bytes(&self) -> u64 {
        u64::from(self.mb) * MIB + u64::from(self.kb) * KIB + u64::from(self.bytes)
    }
}

/// Input buffer shape and dispatch geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferShape {
    pub buffer_type: BufferType,
    /// Unit fields the byte count was collapsed from.
    pub size_components: BufferSizeComponents,
    pub buffer_size_bytes: u64,
    /// `buffer_size_bytes / element width`, floor-divided.
    pub num_elements: u64,
    pub elems_per_thread: u32,
    pub thread_elem_stride: u32,
    pub group_elem_offset: u32,
    pub thread_elem_offset: u32,
    pub num_thread_groups: u32,
}

/// How the input buffer reaches the GPU and how the background upload is paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferPolicy {
    pub read_from_gpu_mem: bool,
    pub buffer_upload_path: BufferUploadPath,
    /// Requested background upload size, clamped to the field bounds.
    pub background_upload_size_mb: u32,
    /// Effective background upload size, never larger than the input buffer.
    pub background_upload_size_bytes: u64,
    pub background_upload_wait_time_ms: u32,
}

impl TransferPolicy {
    /// Returns the wait between background uploads.
    pub fn background_upload_wait(&self) -> Duration {
        Duration::from_millis(u64::from(self.background_upload_wait_time_ms))
    }
}

/// Descriptor indices of the input and output buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferIndices {
    pub input: i32,
    pub output: i32,
}

impl BufferIndices {
    pub const UNASSIGNED: Self = Self {
        input: UNASSIGNED_INDEX,
        output: UNASSIGNED_INDEX,
    };

    pub fn is_assigned(&self) -> bool {
        self.input != UNASSIGNED_INDEX && self.output != UNASSIGNED_INDEX
    }
}

impl Default for BufferIndices {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

/// Pass-through flags consumed verbatim by the rendering loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebugFlags {
    pub enable_vsync: bool,
    pub stable_power_state: bool,
    pub enable_driver_background_threads: bool,
}

/// Diagnostics that are not errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Advisories {
    /// Bytes past the last whole element.
    pub trailing_bytes: u64,
    /// Constant buffer larger than the harness can bind.
    pub exceeds_constant_buffer_limit: bool,
    /// Size the harness actually allocates for the input buffer. Differs
    /// from `buffer_size_bytes` when that is zero, over the limit for the
    /// buffer type, or (for constant buffers) not 256-byte aligned.
    pub allocation_size_bytes: u64,
}

/// Returns the input buffer allocation size for a requested byte count:
/// clamped to `[1, limit]` and, for constant buffers, rounded up to
/// [`CONSTANT_BUFFER_ALIGNMENT`].
pub fn allocation_size(buffer_type: BufferType, requested_bytes: u64) -> u64 {
    let (limit, alignment) = match buffer_type {
        BufferType::Constant => (MAX_CONSTANT_BUFFER_BYTES, CONSTANT_BUFFER_ALIGNMENT),
        _ => (MAX_INPUT_BUFFER_BYTES, 1),
    };
    requested_bytes.clamp(1, limit).next_multiple_of(alignment)
}

/// Fully resolved configuration for one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedConfiguration {
    pub heap: HeapSelection,
    pub buffer: BufferShape,
    pub transfer: TransferPolicy,
    /// Always [`BufferIndices::UNASSIGNED`]; the harness assigns real indices
    /// after allocation.
    pub indices: BufferIndices,
    pub debug: DebugFlags,
    pub advisories: Advisories,
}

/// Resolves a raw configuration against the field registry.
///
/// Out-of-range numbers are clamped, not rejected.
///
/// # Errors
///
/// * `UnknownField` - a key in `raw` is not registered
/// * `InvalidEnumValue` - an enum value is outside its domain
/// * `TypeMismatch` - a value has the wrong shape for its field
/// * `IncompatibleHeapSelection` - the heap triple violates the compatibility rule
/// * `ZeroElementWidth` - `layout` reported a zero-byte element
pub fn resolve<L>(
    raw: &RawConfiguration,
    layout: &L,
) -> Result<ResolvedConfiguration, ResolutionError>
where
    L: ElementLayout + ?Sized,
{
    // 1. Defaulting
    let mut inbound: [Option<&RawValue>; FIELD_COUNT] = [None; FIELD_COUNT];
    for (name, value) in raw.iter() {
        let field = crate::schema::describe(name)?;
        inbound[field.id as usize] = Some(value);
    }
    let mut values = Values(std::array::from_fn(|i| FIELDS[i].default));

    // 2. Enum validation
    for field in FIELDS.iter() {
        if let (Domain::Enum(domain), Some(value)) = (field.domain, inbound[field.id as usize]) {
            let ordinal = match value {
                RawValue::Text(text) => domain.position(text),
                RawValue::Integer(v) => usize::try_from(*v).ok().filter(|i| *i < domain.len()),
                RawValue::Boolean(_) => None,
            };
            let ordinal = ordinal.ok_or_else(|| ResolutionError::InvalidEnumValue {
                field: field.name,
                value: value.to_string(),
            })?;
            values.0[field.id as usize] = FieldValue::Enum(ordinal);
        }
    }

    // 3. Numeric clamping, plus boolean coercion
    for field in FIELDS.iter() {
        let Some(value) = inbound[field.id as usize] else {
            continue;
        };
        match field.domain {
            Domain::Integer { min, max } => {
                let requested = coerce_integer(value).ok_or_else(|| mismatch(field.id, value))?;
                let clamped = requested.clamp(min, max);
                if clamped != requested {
                    log::debug!(
                        "clamped {} from {} to {} (bounds [{}, {}])",
                        field.name,
                        requested,
                        clamped,
                        min,
                        max
                    );
                }
                values.0[field.id as usize] = FieldValue::Integer(clamped);
            }
            Domain::Boolean => {
                let flag = coerce_boolean(value).ok_or_else(|| mismatch(field.id, value))?;
                values.0[field.id as usize] = FieldValue::Boolean(flag);
            }
            Domain::Enum(_) => {}
        }
    }

    // 4. Heap compatibility
    let heap_type: HeapType = values.enumeration(FieldId::HeapType);
    let supplied_page = inbound[FieldId::CpuPageProperty as usize].is_some();
    let supplied_pool = inbound[FieldId::MemoryPool as usize].is_some();
    let (cpu_page_property, memory_pool) = match HeapSelection::implied_by(heap_type) {
        Some((implied_page, implied_pool)) => {
            let page = if supplied_page {
                values.enumeration(FieldId::CpuPageProperty)
            } else {
                log::debug!("{} heap implies {} pages", heap_type, implied_page);
                implied_page
            };
            let pool = if supplied_pool {
                values.enumeration(FieldId::MemoryPool)
            } else {
                log::debug!("{} heap implies pool {}", heap_type, implied_pool);
                implied_pool
            };
            (page, pool)
        }
        None => (
            values.enumeration(FieldId::CpuPageProperty),
            values.enumeration(FieldId::MemoryPool),
        ),
    };
    let heap = HeapSelection {
        heap_type,
        cpu_page_property,
        memory_pool,
    };
    heap.validate()?;

    // 5. Buffer size collapse
    let size_components = BufferSizeComponents {
        mb: values.unsigned(FieldId::InputBufferSizeMb),
        kb: values.unsigned(FieldId::InputBufferSizeKb),
        bytes: values.unsigned(FieldId::InputBufferSizeBytes),
    };
    let buffer_size_bytes = size_components.total_bytes();

    // 6. Element count
    let buffer_type: BufferType = values.enumeration(FieldId::InputBufferType);
    let element_width = layout.element_width_bytes(buffer_type);
    if element_width == 0 {
        return Err(ResolutionError::ZeroElementWidth { buffer_type });
    }
    let num_elements = buffer_size_bytes / element_width;
    let trailing_bytes = buffer_size_bytes % element_width;
    if trailing_bytes != 0 {
        log::debug!(
            "{} trailing bytes past the last {}-byte element",
            trailing_bytes,
            element_width
        );
    }

    // 7. Thread geometry
    let buffer = BufferShape {
        buffer_type,
        size_components,
        buffer_size_bytes,
        num_elements,
        elems_per_thread: values.unsigned(FieldId::ElemsPerThread),
        thread_elem_stride: values.unsigned(FieldId::ThreadElemStride),
        group_elem_offset: values.unsigned(FieldId::GroupElemOffset),
        thread_elem_offset: values.unsigned(FieldId::ThreadElemOffset),
        num_thread_groups: values.unsigned(FieldId::NumThreadGroups),
    };

    // 8. Background upload bounds
    let background_upload_size_mb = values.unsigned(FieldId::BackgroundUploadSize);
    let requested_background = u64::from(background_upload_size_mb) * MIB;
    let background_upload_size_bytes = requested_background.min(buffer_size_bytes);
    if background_upload_size_bytes != requested_background {
        log::debug!(
            "clamped background upload from {} to {} bytes (input buffer size)",
            requested_background,
            background_upload_size_bytes
        );
    }
    let transfer = TransferPolicy {
        read_from_gpu_mem: values.boolean(FieldId::ReadFromGpuMem),
        buffer_upload_path: values.enumeration(FieldId::BufferUploadPath),
        background_upload_size_mb,
        background_upload_size_bytes,
        background_upload_wait_time_ms: values.unsigned(FieldId::BackgroundUploadWaitTime),
    };

    // 9. Index reset
    for id in [FieldId::InputBufferIdx, FieldId::OutputBufferIdx] {
        if let FieldValue::Integer(v) = values.0[id as usize] {
            if v != i64::from(UNASSIGNED_INDEX) {
                log::debug!("discarding inbound {} = {}", id.name(), v);
            }
        }
    }

    let resolved = ResolvedConfiguration {
        heap,
        buffer,
        transfer,
        indices: BufferIndices::UNASSIGNED,
        debug: DebugFlags {
            enable_vsync: values.boolean(FieldId::EnableVSync),
            stable_power_state: values.boolean(FieldId::StablePowerState),
            enable_driver_background_threads: values
                .boolean(FieldId::EnableDriverBackgroundThreads),
        },
        advisories: Advisories {
            trailing_bytes,
            exceeds_constant_buffer_limit: buffer_type == BufferType::Constant
                && buffer_size_bytes > MAX_CONSTANT_BUFFER_BYTES,
            allocation_size_bytes: allocation_size(buffer_type, buffer_size_bytes),
        },
    };
    log::trace!("resolved configuration: {:?}", resolved);
    Ok(resolved)
}

fn coerce_integer(value: &RawValue) -> Option<i64> {
    match value {
        RawValue::Integer(v) => Some(*v),
        RawValue::Text(text) => parse_integer(text),
        RawValue::Boolean(_) => None,
    }
}

fn coerce_boolean(value: &RawValue) -> Option<bool> {
    match value {
        RawValue::Boolean(b) => Some(*b),
        RawValue::Text(text) if text.trim().eq_ignore_ascii_case("true") => Some(true),
        RawValue::Text(text) if text.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn mismatch(id: FieldId, value: &RawValue) -> ResolutionError {
    let field = id.field();
    ResolutionError::TypeMismatch {
        field: field.name,
        expected: field.kind(),
        found: value.to_string(),
    }
}

/// Typed working set, one slot per registered field.
struct Values([FieldValue; FIELD_COUNT]);

impl Values {
    fn enumeration<E: SettingEnum>(&self, id: FieldId) -> E {
        match self.0[id as usize] {
            // Ordinals were checked against the domain during enum validation.
            FieldValue::Enum(ordinal) => E::ALL[ordinal],
            other => unreachable!("{} holds {:?}, expected {}", id.name(), other, FieldKind::Enum),
        }
    }

    fn integer(&self, id: FieldId) -> i64 {
        match self.0[id as usize] {
            FieldValue::Integer(v) => v,
            other => unreachable!(
                "{} holds {:?}, expected {}",
                id.name(),
                other,
                FieldKind::Integer
            ),
        }
    }

    /// For fields whose bounds are non-negative and fit in `u32`.
    fn unsigned(&self, id: FieldId) -> u32 {
        u32::try_from(self.integer(id)).unwrap_or_default()
    }

    fn boolean(&self, id: FieldId) -> bool {
        match self.0[id as usize] {
            FieldValue::Boolean(b) => b,
            other => unreachable!(
                "{} holds {:?}, expected {}",
                id.name(),
                other,
                FieldKind::Boolean
            ),
        }
    }
}
