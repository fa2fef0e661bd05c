//! Enumerations for the heap, buffer and upload settings.
//!
//! Each enumeration carries a stable name (used as the raw configuration
//! value and in error messages), a presentation label (used only by
//! front-ends) and an ordinal that matches the harness-side constants.

use std::fmt;

/// Label lookup table for one enumeration.
///
/// `names` and `labels` are parallel arrays indexed by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumDomain {
    /// Rust type name of the enumeration (e.g. "HeapType").
    pub type_name: &'static str,
    /// Stable variant names in declaration order.
    pub names: &'static [&'static str],
    /// Presentation labels in declaration order.
    pub labels: &'static [&'static str],
}

impl EnumDomain {
    /// Returns the number of variants.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the domain has no variants.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Finds the ordinal for a stable name or a presentation label.
    pub fn position(&self, text: &str) -> Option<usize> {
        let text = text.trim();
        self.names
            .iter()
            .position(|name| *name == text)
            .or_else(|| self.labels.iter().position(|label| *label == text))
    }

    /// Returns the stable name for an ordinal.
    pub fn name(&self, ordinal: usize) -> Option<&'static str> {
        self.names.get(ordinal).copied()
    }

    /// Returns the presentation label for an ordinal.
    pub fn label(&self, ordinal: usize) -> Option<&'static str> {
        self.labels.get(ordinal).copied()
    }
}

/// Common behaviour for the setting enumerations.
pub trait SettingEnum: Copy + Eq + fmt::Debug + 'static {
    /// All variants in declaration order.
    const ALL: &'static [Self];

    /// Name and label table for this enumeration.
    const DOMAIN: &'static EnumDomain;

    /// Returns the stable name of this variant.
    fn name(&self) -> &'static str;

    /// Returns the zero-based ordinal of this variant.
    fn ordinal(&self) -> usize {
        Self::ALL
            .iter()
            .position(|variant| variant == self)
            .unwrap_or_default()
    }

    /// Returns the presentation label of this variant.
    fn label(&self) -> &'static str {
        Self::DOMAIN.labels[self.ordinal()]
    }

    /// Returns the variant with the given ordinal.
    fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    /// Parses a stable name or presentation label.
    fn parse(text: &str) -> Option<Self> {
        Self::DOMAIN.position(text).and_then(Self::from_ordinal)
    }
}

macro_rules! setting_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident in $domain:ident {
            $( $(#[$vmeta:meta])* $variant:ident($stable:literal) => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        /// Name and label table.
        pub const $domain: EnumDomain = EnumDomain {
            type_name: stringify!($name),
            names: &[$( $stable, )+],
            labels: &[$( $label, )+],
        };

        impl SettingEnum for $name {
            const ALL: &'static [Self] = &[$( Self::$variant, )+];
            const DOMAIN: &'static EnumDomain = &$domain;

            fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $stable, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

setting_enum! {
    /// Allocation category of the input buffer's heap.
    pub enum HeapType in HEAP_TYPES {
        /// Host-upload-optimized heap.
        Upload("Upload") => "Upload",
        /// Device-local heap with no CPU access.
        Default("Default") => "Default",
        /// Explicit page property and memory pool chosen by the user.
        Custom("Custom") => "Custom",
        /// Device-local heap that the CPU can write directly.
        GpuUpload("GPUUpload") => "GPU Upload",
    }
}

setting_enum! {
    /// Host access mode for a heap's pages.
    pub enum CpuPageProperty in CPU_PAGE_PROPERTIES {
        NotAvailable("NotAvailable") => "Not Available (No CPU Access)",
        WriteCombine("WriteCombine") => "Write-Combined (Uncached)",
        WriteBack("WriteBack") => "Write-Back (Cached)",
    }
}

setting_enum! {
    /// Physical memory tier backing a heap.
    pub enum MemoryPool in MEMORY_POOLS {
        /// System RAM.
        L0("L0") => "L0 (CPU RAM)",
        /// Dedicated video memory.
        L1("L1") => "L1 (VRAM)",
    }
}

setting_enum! {
    /// View type used by the compute job to read the input buffer.
    pub enum BufferType in BUFFER_TYPES {
        Raw("Raw") => "Raw",
        Formatted("Formatted") => "Formatted",
        Structured("Structured") => "Structured",
        Constant("Constant") => "Constant",
    }
}

setting_enum! {
    /// Queue used to upload the input buffer when it is not CPU-writable.
    pub enum BufferUploadPath in BUFFER_UPLOAD_PATHS {
        DirectQueue("DirectQueue") => "DIRECT Queue",
        UploadCopyQueue("UploadCopyQueue") => "Upload COPY Queue",
        FastUploadCopyQueue("FastUploadCopyQueue") => "Fast Upload COPY Queue",
    }
}

impl HeapType {
    /// Returns true for the built-in heap types whose page property and
    /// memory pool are fixed by the driver.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom)
    }
}
