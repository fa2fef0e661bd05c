//! Typed configuration for a GPU memory-pool benchmark harness.
//!
//! The [`schema`] module describes every tunable parameter; [`resolve`]
//! turns a sparse, possibly out-of-range [`RawConfiguration`] into one
//! consistent [`ResolvedConfiguration`] the harness consumes as-is.

pub mod changes;
pub mod error;
pub mod raw;
pub mod resolve;
pub mod schema;
#[cfg(feature = "shader")]
pub mod shader;
pub mod sweep;
pub mod traits;
pub mod types;
pub mod workload;

pub use changes::{needs_queue_flush, needs_rebuild, needs_recompile, Transition};
pub use error::{MempoolError, ResolutionError};
pub use raw::{RawConfiguration, RawValue};
pub use resolve::{
    resolve, Advisories, BufferIndices, BufferShape, BufferSizeComponents, DebugFlags,
    HeapSelection, ResolvedConfiguration, TransferPolicy, UNASSIGNED_INDEX,
};
pub use schema::{all_fields, all_visible, describe, visible_for, Domain, Field, FieldKind, FieldValue};
pub use traits::{AllocatedRun, BufferAllocator, ElementLayout, UniformLayout};
pub use types::{BufferType, BufferUploadPath, CpuPageProperty, HeapType, MemoryPool, SettingEnum};
