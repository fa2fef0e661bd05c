//! Harness collaborator seams.
//!
//! The benchmark harness owns the GPU data layout and the physical buffer
//! allocation. These traits are the only points where the resolver and its
//! callers reach into the harness.

use crate::resolve::{BufferIndices, ResolvedConfiguration};
use crate::types::BufferType;

/// Per-element byte width of each buffer type, as laid out by the harness.
pub trait ElementLayout {
    /// Returns the byte width of one element of `buffer_type`.
    fn element_width_bytes(&self, buffer_type: BufferType) -> u64;
}

impl<F> ElementLayout for F
where
    F: Fn(BufferType) -> u64,
{
    fn element_width_bytes(&self, buffer_type: BufferType) -> u64 {
        self(buffer_type)
    }
}

/// A layout that uses the same element width for every buffer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLayout {
    width: u64,
}

impl UniformLayout {
    /// The harness's compute job reads one float4 per element.
    pub const FLOAT4: Self = Self { width: 16 };

    pub const fn new(width: u64) -> Self {
        Self { width }
    }

    pub fn width(&self) -> u64 {
        self.width
    }
}

impl Default for UniformLayout {
    fn default() -> Self {
        Self::FLOAT4
    }
}

impl ElementLayout for UniformLayout {
    fn element_width_bytes(&self, _buffer_type: BufferType) -> u64 {
        self.width
    }
}

/// Allocation callback: the harness creates the physical buffers for a
/// resolved configuration and reports their descriptor indices.
pub trait BufferAllocator {
    type Error;

    /// Allocates input and output buffers for `config`.
    ///
    /// # Returns
    /// * `Ok(BufferIndices)` - Descriptor indices of the new buffers
    /// * `Err(Self::Error)` - If the harness could not allocate
    fn allocate(&mut self, config: &ResolvedConfiguration) -> Result<BufferIndices, Self::Error>;
}

/// A resolved configuration paired with the indices the harness assigned.
///
/// The resolved configuration itself is never mutated; the indices live
/// alongside it in the caller's record of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedRun {
    pub config: ResolvedConfiguration,
    pub indices: BufferIndices,
}

impl AllocatedRun {
    /// Hands `config` to the allocator and records the returned indices.
    pub fn allocate<A: BufferAllocator>(
        config: ResolvedConfiguration,
        allocator: &mut A,
    ) -> Result<Self, A::Error> {
        let indices = allocator.allocate(&config)?;
        log::debug!(
            "harness assigned input buffer {} and output buffer {}",
            indices.input,
            indices.output
        );
        Ok(Self { config, indices })
    }
}
