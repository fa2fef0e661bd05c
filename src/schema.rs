//! Field constraint model.
//!
//! Static description of every configurable parameter: kind, domain,
//! default, visibility and whether the resolved value is packed into the
//! shader constant buffer. The registry is a `static` array, so it is
//! immutable for the life of the process and needs no locking.

use crate::error::ResolutionError;
use crate::types::{
    EnumDomain, HeapType, BUFFER_TYPES, BUFFER_UPLOAD_PATHS, CPU_PAGE_PROPERTIES, HEAP_TYPES,
    MEMORY_POOLS,
};
use std::fmt;

/// Shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Enum,
    Integer,
    Boolean,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enum => "enum",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        })
    }
}

/// Set of values a field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Ordered, labeled variants.
    Enum(&'static EnumDomain),
    /// Inclusive integer range.
    Integer { min: i64, max: i64 },
    Boolean,
}

impl Domain {
    /// Returns the kind of value this domain holds.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Enum(_) => FieldKind::Enum,
            Self::Integer { .. } => FieldKind::Integer,
            Self::Boolean => FieldKind::Boolean,
        }
    }

    /// Returns true if `value` lies within this domain.
    pub fn contains(&self, value: FieldValue) -> bool {
        match (self, value) {
            (Self::Enum(domain), FieldValue::Enum(ordinal)) => ordinal < domain.len(),
            (Self::Integer { min, max }, FieldValue::Integer(v)) => (*min..=*max).contains(&v),
            (Self::Boolean, FieldValue::Boolean(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(domain) => write!(f, "{{{}}}", domain.names.join(", ")),
            Self::Integer { min, max } => write!(f, "[{}, {}]", min, max),
            Self::Boolean => f.write_str("{true, false}"),
        }
    }
}

/// A typed field value. Enum values are stored by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Enum(usize),
    Integer(i64),
    Boolean(bool),
}

/// Settings group a field is shown under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    TestConfig,
    Debug,
}

impl FieldGroup {
    /// Returns the group's display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TestConfig => "Test Config",
            Self::Debug => "Debug",
        }
    }
}

/// Registry index of every field, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    HeapType,
    CpuPageProperty,
    MemoryPool,
    InputBufferType,
    InputBufferSizeMb,
    InputBufferSizeKb,
    InputBufferSizeBytes,
    ElemsPerThread,
    ThreadElemStride,
    GroupElemOffset,
    ThreadElemOffset,
    NumThreadGroups,
    ReadFromGpuMem,
    BufferUploadPath,
    BackgroundUploadSize,
    BackgroundUploadWaitTime,
    NumInputBufferElems,
    InputBufferIdx,
    OutputBufferIdx,
    EnableVSync,
    StablePowerState,
    EnableDriverBackgroundThreads,
}

impl FieldId {
    /// Returns the registry entry for this field.
    pub fn field(self) -> &'static Field {
        &FIELDS[self as usize]
    }

    /// Returns the stable field name.
    pub fn name(self) -> &'static str {
        self.field().name
    }
}

/// One configurable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub id: FieldId,
    /// Stable identifier used as the raw configuration key.
    pub name: &'static str,
    pub display_name: &'static str,
    pub help: &'static str,
    pub group: FieldGroup,
    pub domain: Domain,
    pub default: FieldValue,
    /// Whether a front-end should render the field. Does not affect resolution.
    pub visible: bool,
    /// Whether the value is packed into the shader constant buffer rather
    /// than being a host-only directive.
    pub shader_constant: bool,
}

impl Field {
    /// Returns the kind of this field.
    pub fn kind(&self) -> FieldKind {
        self.domain.kind()
    }

    /// Returns true if a front-end editing a configuration with `heap_type`
    /// should render this field. The page property and memory pool are
    /// only editable for custom heaps.
    pub fn is_visible_for(&self, heap_type: HeapType) -> bool {
        match self.id {
            FieldId::CpuPageProperty | FieldId::MemoryPool => heap_type == HeapType::Custom,
            _ => self.visible,
        }
    }

    /// Returns the inclusive bounds of an integer field.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self.domain {
            Domain::Integer { min, max } => Some((min, max)),
            _ => None,
        }
    }

    /// Renders the default value the way it would be written in a raw
    /// configuration.
    pub fn default_text(&self) -> String {
        match (self.domain, self.default) {
            (Domain::Enum(domain), FieldValue::Enum(ordinal)) => {
                domain.name(ordinal).unwrap_or("?").to_string()
            }
            (_, FieldValue::Integer(v)) => v.to_string(),
            (_, FieldValue::Boolean(b)) => b.to_string(),
            (_, FieldValue::Enum(ordinal)) => ordinal.to_string(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, default {})",
            self.name,
            self.kind(),
            self.domain,
            self.default_text()
        )
    }
}

const I32_RANGE: Domain = Domain::Integer {
    min: i32::MIN as i64,
    max: i32::MAX as i64,
};

const fn int(min: i64, max: i64) -> Domain {
    Domain::Integer { min, max }
}

const fn field(
    id: FieldId,
    name: &'static str,
    display_name: &'static str,
    group: FieldGroup,
    domain: Domain,
    default: FieldValue,
) -> Field {
    Field {
        id,
        name,
        display_name,
        help: "",
        group,
        domain,
        default,
        visible: true,
        shader_constant: false,
    }
}

const fn hidden(mut f: Field) -> Field {
    f.visible = false;
    f
}

const fn shader_constant(mut f: Field) -> Field {
    f.shader_constant = true;
    f
}

const fn help(mut f: Field, text: &'static str) -> Field {
    f.help = text;
    f
}

use FieldGroup::{Debug as DebugGroup, TestConfig};
use FieldValue::{Boolean as B, Enum as E, Integer as I};

/// Number of registered fields.
pub const FIELD_COUNT: usize = 22;

/// The field registry, in declaration order: heap, buffer shape, transfer,
/// runtime indices, debug.
pub static FIELDS: [Field; FIELD_COUNT] = [
    shader_constant(field(
        FieldId::HeapType,
        "HeapType",
        "Heap Type",
        TestConfig,
        Domain::Enum(&HEAP_TYPES),
        E(0),
    )),
    hidden(field(
        FieldId::CpuPageProperty,
        "CPUPageProperty",
        "Heap CPUPageProperty",
        TestConfig,
        Domain::Enum(&CPU_PAGE_PROPERTIES),
        E(0),
    )),
    hidden(field(
        FieldId::MemoryPool,
        "MemoryPool",
        "Heap MemoryPool",
        TestConfig,
        Domain::Enum(&MEMORY_POOLS),
        E(0),
    )),
    field(
        FieldId::InputBufferType,
        "InputBufferType",
        "Input Buffer Type",
        TestConfig,
        Domain::Enum(&BUFFER_TYPES),
        E(0),
    ),
    field(
        FieldId::InputBufferSizeMb,
        "InputBufferSizeMB",
        "Input Buffer Size MB",
        TestConfig,
        int(0, 256),
        I(16),
    ),
    field(
        FieldId::InputBufferSizeKb,
        "InputBufferSizeKB",
        "Input Buffer Size KB",
        TestConfig,
        int(0, 1024),
        I(0),
    ),
    field(
        FieldId::InputBufferSizeBytes,
        "InputBufferSizeBytes",
        "Input Buffer Size Bytes",
        TestConfig,
        int(0, 1024),
        I(0),
    ),
    field(
        FieldId::ElemsPerThread,
        "ElemsPerThread",
        "Elems Per Thread",
        TestConfig,
        int(1, 64),
        I(1),
    ),
    field(
        FieldId::ThreadElemStride,
        "ThreadElemStride",
        "Thread Elem Stride",
        TestConfig,
        int(1, 64),
        I(1),
    ),
    field(
        FieldId::GroupElemOffset,
        "GroupElemOffset",
        "Group Elem Offset",
        TestConfig,
        int(0, 16),
        I(1),
    ),
    field(
        FieldId::ThreadElemOffset,
        "ThreadElemOffset",
        "Thread Elem Offset",
        TestConfig,
        int(0, 16),
        I(1),
    ),
    field(
        FieldId::NumThreadGroups,
        "NumThreadGroups",
        "Num Thread Groups",
        TestConfig,
        int(1, 65535),
        I(4096),
    ),
    field(
        FieldId::ReadFromGpuMem,
        "ReadFromGPUMem",
        "Read From GPU Memory",
        TestConfig,
        Domain::Boolean,
        B(false),
    ),
    field(
        FieldId::BufferUploadPath,
        "BufferUploadPath",
        "Buffer Upload Path",
        TestConfig,
        Domain::Enum(&BUFFER_UPLOAD_PATHS),
        E(2),
    ),
    field(
        FieldId::BackgroundUploadSize,
        "BackgroundUploadSize",
        "Background Upload Size (MB)",
        TestConfig,
        int(0, 256),
        I(0),
    ),
    field(
        FieldId::BackgroundUploadWaitTime,
        "BackgroundUploadWaitTime",
        "Background Upload Size Wait Time (ms)",
        TestConfig,
        int(0, 100),
        I(0),
    ),
    hidden(field(
        FieldId::NumInputBufferElems,
        "NumInputBufferElems",
        "Num Input Buffer Elems",
        TestConfig,
        I32_RANGE,
        I(0),
    )),
    hidden(shader_constant(field(
        FieldId::InputBufferIdx,
        "InputBufferIdx",
        "Input Buffer Idx",
        TestConfig,
        I32_RANGE,
        I(-1),
    ))),
    hidden(shader_constant(field(
        FieldId::OutputBufferIdx,
        "OutputBufferIdx",
        "Output Buffer Idx",
        TestConfig,
        I32_RANGE,
        I(-1),
    ))),
    help(
        field(
            FieldId::EnableVSync,
            "EnableVSync",
            "Enable VSync",
            DebugGroup,
            Domain::Boolean,
            B(true),
        ),
        "Enables or disables vertical sync during Present",
    ),
    help(
        field(
            FieldId::StablePowerState,
            "StablePowerState",
            "Stable Power State",
            DebugGroup,
            Domain::Boolean,
            B(true),
        ),
        "Enables the stable power state, which stabilizes GPU clocks for more consistent performance",
    ),
    field(
        FieldId::EnableDriverBackgroundThreads,
        "EnableDriverBackgroundThreads",
        "Enable Driver Background Threads",
        DebugGroup,
        Domain::Boolean,
        B(false),
    ),
];

/// Looks up a field by its stable name.
///
/// # Errors
///
/// Returns `ResolutionError::UnknownField` if `name` is not registered.
pub fn describe(name: &str) -> Result<&'static Field, ResolutionError> {
    FIELDS
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| ResolutionError::UnknownField {
            name: name.to_string(),
        })
}

/// Returns the fields a front-end should render, in declaration order.
pub fn all_visible() -> impl Iterator<Item = &'static Field> {
    FIELDS.iter().filter(|f| f.visible)
}

/// Returns the fields to render while editing a configuration whose heap
/// type is `heap_type`, in declaration order.
pub fn visible_for(heap_type: HeapType) -> impl Iterator<Item = &'static Field> {
    FIELDS.iter().filter(move |f| f.is_visible_for(heap_type))
}

/// Returns every registered field, hidden ones included.
pub fn all_fields() -> impl Iterator<Item = &'static Field> {
    FIELDS.iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_match_registry_order() {
        for (i, f) in FIELDS.iter().enumerate() {
            assert_eq!(f.id as usize, i, "field {} is out of order", f.name);
        }
    }

    #[test]
    fn test_defaults_within_domain() {
        for f in all_fields() {
            assert!(f.domain.contains(f.default), "default of {} out of domain", f.name);
            if let Some((min, max)) = f.bounds() {
                assert!(min <= max, "{} has inverted bounds", f.name);
            }
        }
    }

    #[test]
    fn test_names_are_unique() {
        for (i, a) in FIELDS.iter().enumerate() {
            for b in &FIELDS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_describe_known_field() {
        let f = describe("NumThreadGroups").unwrap();
        assert_eq!(f.id, FieldId::NumThreadGroups);
        assert_eq!(f.kind(), FieldKind::Integer);
        assert_eq!(f.bounds(), Some((1, 65535)));
        assert_eq!(f.default, FieldValue::Integer(4096));
    }

    #[test]
    fn test_describe_unknown_field() {
        let err = describe("NumThreadGroup").unwrap_err();
        assert_eq!(
            err,
            ResolutionError::UnknownField {
                name: "NumThreadGroup".to_string()
            }
        );
        assert!(describe("heaptype").is_err());
    }

    #[test]
    fn test_all_visible_excludes_hidden_fields() {
        let visible: Vec<&str> = all_visible().map(|f| f.name).collect();
        for hidden in [
            "CPUPageProperty",
            "MemoryPool",
            "NumInputBufferElems",
            "InputBufferIdx",
            "OutputBufferIdx",
        ] {
            assert!(!visible.contains(&hidden), "{} should be hidden", hidden);
        }
        assert_eq!(visible.len(), FIELD_COUNT - 5);
    }

    #[test]
    fn test_all_visible_declaration_order() {
        let visible: Vec<&str> = all_visible().map(|f| f.name).collect();
        assert_eq!(visible.first(), Some(&"HeapType"));
        assert_eq!(visible[1], "InputBufferType");
        assert_eq!(visible.last(), Some(&"EnableDriverBackgroundThreads"));

        let pos = |name: &str| visible.iter().position(|n| *n == name).unwrap();
        assert!(pos("InputBufferSizeMB") < pos("NumThreadGroups"));
        assert!(pos("NumThreadGroups") < pos("BufferUploadPath"));
        assert!(pos("BackgroundUploadWaitTime") < pos("EnableVSync"));
    }

    #[test]
    fn test_visible_for_custom_heap() {
        let names: Vec<&str> = visible_for(HeapType::Custom).map(|f| f.name).collect();
        assert_eq!(names.len(), FIELD_COUNT - 3);
        assert_eq!(&names[..4], ["HeapType", "CPUPageProperty", "MemoryPool", "InputBufferType"]);
        assert!(!names.contains(&"InputBufferIdx"));
        assert!(!names.contains(&"NumInputBufferElems"));
    }

    #[test]
    fn test_visible_for_builtin_heaps() {
        for heap in [HeapType::Upload, HeapType::Default, HeapType::GpuUpload] {
            let names: Vec<&str> = visible_for(heap).map(|f| f.name).collect();
            let static_names: Vec<&str> = all_visible().map(|f| f.name).collect();
            assert_eq!(names, static_names, "{}", heap);
        }
        assert!(!FieldId::MemoryPool.field().is_visible_for(HeapType::Default));
        assert!(FieldId::MemoryPool.field().is_visible_for(HeapType::Custom));
        // The static schema stays the same regardless of context.
        assert!(!FieldId::MemoryPool.field().visible);
    }

    #[test]
    fn test_shader_constant_fields() {
        let packed: Vec<&str> = all_fields()
            .filter(|f| f.shader_constant)
            .map(|f| f.name)
            .collect();
        assert_eq!(packed, ["HeapType", "InputBufferIdx", "OutputBufferIdx"]);
    }

    #[test]
    fn test_debug_group() {
        let debug: Vec<&str> = all_fields()
            .filter(|f| f.group == FieldGroup::Debug)
            .map(|f| f.name)
            .collect();
        assert_eq!(
            debug,
            ["EnableVSync", "StablePowerState", "EnableDriverBackgroundThreads"]
        );
        assert_eq!(FieldGroup::Debug.name(), "Debug");
        assert!(FieldId::EnableVSync.field().help.contains("vertical sync"));
    }

    #[test]
    fn test_field_display() {
        let text = FieldId::HeapType.field().to_string();
        assert!(text.contains("HeapType"));
        assert!(text.contains("enum"));
        assert!(text.contains("GPUUpload"));
        assert!(text.contains("default Upload"));

        let text = FieldId::ElemsPerThread.field().to_string();
        assert!(text.contains("[1, 64]"));
    }

    #[test]
    fn test_domain_contains() {
        let d = FieldId::MemoryPool.field().domain;
        assert!(d.contains(FieldValue::Enum(1)));
        assert!(!d.contains(FieldValue::Enum(2)));
        assert!(!d.contains(FieldValue::Integer(0)));
        assert!(!int(0, 4).contains(FieldValue::Integer(5)));
    }
}
