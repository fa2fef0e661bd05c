//! Shader-facing packing of a resolved configuration.
//!
//! Only fields marked as shader constants in the schema reach the GPU
//! through the constant buffer. The buffer geometry is baked into the
//! compute job as preprocessor defines instead.

use crate::resolve::ResolvedConfiguration;
use crate::schema::{all_fields, Field};
use crate::traits::AllocatedRun;
use crate::types::{BufferType, SettingEnum};

/// Register the constant buffer is bound to.
pub const CBUFFER_REGISTER: u32 = 12;

/// Constant buffer contents for the compute job.
/// Must match the AppSettings cbuffer in the HLSL source.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShaderConstants {
    /// Heap type ordinal (0-3 matching HeapType).
    pub heap_type: i32,
    /// Descriptor index of the input buffer.
    pub input_buffer_idx: i32,
    /// Descriptor index of the output buffer.
    pub output_buffer_idx: i32,
    /// Padding for 16-byte alignment.
    pub _padding: i32,
}

impl ShaderConstants {
    /// Packs an allocated run. Indices come from the harness, not from the
    /// resolved configuration, which always holds the unassigned sentinel.
    pub fn new(run: &AllocatedRun) -> Self {
        Self {
            heap_type: run.config.heap.heap_type.ordinal() as i32,
            input_buffer_idx: run.indices.input,
            output_buffer_idx: run.indices.output,
            _padding: 0,
        }
    }

    /// Returns the bytes to upload into the constant buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Returns the schema fields packed into [`ShaderConstants`], in order.
pub fn packed_fields() -> impl Iterator<Item = &'static Field> {
    all_fields().filter(|f| f.shader_constant)
}

/// Preprocessor defines the compute job is compiled with.
pub fn compile_defines(config: &ResolvedConfiguration) -> Vec<(&'static str, i64)> {
    let buffer = &config.buffer;
    let is = |t: BufferType| i64::from(buffer.buffer_type == t);

    vec![
        ("ElemsPerThread_", i64::from(buffer.elems_per_thread)),
        ("ThreadElemOffset_", i64::from(buffer.thread_elem_offset)),
        ("GroupElemOffset_", i64::from(buffer.group_elem_offset)),
        (
            "NumInputBufferElems_",
            i64::try_from(buffer.num_elements).unwrap_or(i64::MAX),
        ),
        ("ThreadElemStride_", i64::from(buffer.thread_elem_stride)),
        ("RawBuffer_", is(BufferType::Raw)),
        ("FormattedBuffer_", is(BufferType::Formatted)),
        ("StructuredBuffer_", is(BufferType::Structured)),
        ("ConstantBuffer_", is(BufferType::Constant)),
    ]
}

/// Schema names of the packed fields, for diagnostics.
pub fn packed_field_names() -> Vec<&'static str> {
    packed_fields().map(|f| f.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawConfiguration;
    use crate::resolve::{resolve, BufferIndices};
    use crate::schema::FieldId;
    use crate::traits::UniformLayout;
    use crate::types::HeapType;

    fn config(raw: RawConfiguration) -> ResolvedConfiguration {
        resolve(&raw, &UniformLayout::FLOAT4).unwrap()
    }

    #[test]
    fn test_shader_constants_size() {
        // Must be 16 bytes for constant buffer alignment
        assert_eq!(std::mem::size_of::<ShaderConstants>(), 16);
    }

    #[test]
    fn test_packed_fields_match_layout() {
        let ids: Vec<FieldId> = packed_fields().map(|f| f.id).collect();
        assert_eq!(
            ids,
            [
                FieldId::HeapType,
                FieldId::InputBufferIdx,
                FieldId::OutputBufferIdx
            ]
        );
        assert_eq!(
            packed_field_names(),
            ["HeapType", "InputBufferIdx", "OutputBufferIdx"]
        );
    }

    #[test]
    fn test_shader_constants_from_run() {
        let run = AllocatedRun {
            config: config(RawConfiguration::new().with("HeapType", "GPUUpload")),
            indices: BufferIndices {
                input: 7,
                output: 8,
            },
        };
        let constants = ShaderConstants::new(&run);
        assert_eq!(constants.heap_type, HeapType::GpuUpload.ordinal() as i32);
        assert_eq!(constants.input_buffer_idx, 7);
        assert_eq!(constants.output_buffer_idx, 8);

        let bytes = constants.as_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &3i32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &7i32.to_ne_bytes());
    }

    #[test]
    fn test_shader_constants_before_allocation() {
        let run = AllocatedRun {
            config: config(RawConfiguration::new()),
            indices: BufferIndices::UNASSIGNED,
        };
        let constants = ShaderConstants::new(&run);
        assert_eq!(constants.input_buffer_idx, -1);
        assert_eq!(constants.output_buffer_idx, -1);
    }

    #[test]
    fn test_compile_defines() {
        let cfg = config(
            RawConfiguration::new()
                .with("InputBufferType", "Structured")
                .with("ElemsPerThread", 4)
                .with("InputBufferSizeMB", 1),
        );
        let defines = compile_defines(&cfg);
        let get = |name: &str| defines.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);

        assert_eq!(defines.len(), 9);
        assert_eq!(get("ElemsPerThread_"), Some(4));
        assert_eq!(get("NumInputBufferElems_"), Some(65536));
        assert_eq!(get("StructuredBuffer_"), Some(1));
        assert_eq!(get("RawBuffer_"), Some(0));
        assert_eq!(get("ConstantBuffer_"), Some(0));
    }

    #[test]
    fn test_defines_follow_recompile_triggers() {
        use crate::changes::needs_recompile;

        let base = config(RawConfiguration::new());
        for raw in [
            RawConfiguration::new().with("NumThreadGroups", 8),
            RawConfiguration::new().with("ThreadElemStride", 4),
            RawConfiguration::new().with("InputBufferSizeKB", 1),
            RawConfiguration::new().with("HeapType", "Default"),
        ] {
            let other = config(raw);
            assert_eq!(
                compile_defines(&base) != compile_defines(&other),
                needs_recompile(&base, &other)
            );
        }
    }
}
