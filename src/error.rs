//! Error types for configuration resolution.
//!
//! Every error here is recoverable by the caller. Numeric clamping is
//! not an error and never produces one of these.

use crate::schema::FieldKind;
use crate::types::{BufferType, CpuPageProperty, HeapType, MemoryPool};
use thiserror::Error;

/// Errors returned by field lookup and by [`resolve`](crate::resolve::resolve).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The field name is not registered in the schema.
    #[error("Unknown field: {name}")]
    UnknownField { name: String },

    /// An enum field holds a value outside its declared domain.
    #[error("Invalid value '{value}' for enum field {field}")]
    InvalidEnumValue { field: &'static str, value: String },

    /// The heap type, page property and pool do not form a valid heap.
    #[error(
        "Incompatible heap selection: {heap_type} heap with {cpu_page_property} pages in pool {memory_pool}"
    )]
    IncompatibleHeapSelection {
        heap_type: HeapType,
        cpu_page_property: CpuPageProperty,
        memory_pool: MemoryPool,
    },

    /// A raw value has the wrong shape for its field.
    #[error("Field {field} expects {expected} value, got '{found}'")]
    TypeMismatch {
        field: &'static str,
        expected: FieldKind,
        found: String,
    },

    /// The element layout reported a zero-byte element.
    #[error("Element width for {buffer_type} buffers is zero")]
    ZeroElementWidth { buffer_type: BufferType },
}

/// Unified error type for the mempool-config binary.
#[derive(Error, Debug)]
pub enum MempoolError {
    /// Resolution failed.
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Malformed command-line configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}
