//! Raw, caller-supplied configuration.
//!
//! A `RawConfiguration` is a sparse mapping from field name to an untyped
//! value, as produced by a UI, a settings file or the command line. It may
//! omit fields and may hold out-of-range numbers; interpreting it is the
//! resolver's job.

use crate::error::MempoolError;
use crate::resolve::ResolvedConfiguration;
use crate::schema::FieldId;
use crate::types::SettingEnum;
use std::collections::BTreeMap;
use std::fmt;
use std::num::IntErrorKind;

/// An untyped value for one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawValue {
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl RawValue {
    /// Interprets command-line text: `true`/`false` become booleans,
    /// anything that parses as an integer becomes an integer (saturating
    /// at the `i64` bounds), the rest stays text.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Self::Boolean(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Self::Boolean(false)
        } else if let Some(v) = parse_integer(trimmed) {
            Self::Integer(v)
        } else {
            Self::Text(trimmed.to_string())
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<u32> for RawValue {
    fn from(v: u32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Parses decimal integer text, saturating to `i64::MIN`/`i64::MAX` when
/// the digits overflow.
pub(crate) fn parse_integer(text: &str) -> Option<i64> {
    match text.trim().parse::<i64>() {
        Ok(v) => Some(v),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Sparse mapping from field name to raw value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawConfiguration {
    values: BTreeMap<String, RawValue>,
}

impl RawConfiguration {
    /// Creates an empty configuration; every field resolves to its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Removes a field so that its default applies again.
    pub fn remove(&mut self, name: &str) -> Option<RawValue> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the supplied fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses one `NAME=VALUE` assignment.
    ///
    /// # Errors
    ///
    /// Returns `MempoolError::Config` if there is no `=` or the name is empty.
    pub fn parse_assignment(text: &str) -> Result<(String, RawValue), MempoolError> {
        let (name, value) = text
            .split_once('=')
            .ok_or_else(|| MempoolError::Config(format!("expected NAME=VALUE, got '{}'", text)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(MempoolError::Config(format!(
                "missing field name in '{}'",
                text
            )));
        }
        Ok((name.to_string(), RawValue::parse(value)))
    }

    /// Builds a configuration from `NAME=VALUE` assignments. Later
    /// assignments to the same name win.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self, MempoolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw = Self::new();
        for assignment in assignments {
            let (name, value) = Self::parse_assignment(assignment.as_ref())?;
            raw.set(name, value);
        }
        Ok(raw)
    }

    /// Rebuilds a raw configuration that resolves back to `resolved`.
    ///
    /// The buffer size is written from the clamped unit fields recorded at
    /// resolution time, never decomposed from the byte total. Runtime
    /// indices and the derived element count are left out.
    pub fn from_resolved(resolved: &ResolvedConfiguration) -> Self {
        let heap = &resolved.heap;
        let buffer = &resolved.buffer;
        let transfer = &resolved.transfer;
        let debug = &resolved.debug;

        Self::new()
            .with(FieldId::HeapType.name(), heap.heap_type.name())
            .with(FieldId::CpuPageProperty.name(), heap.cpu_page_property.name())
            .with(FieldId::MemoryPool.name(), heap.memory_pool.name())
            .with(FieldId::InputBufferType.name(), buffer.buffer_type.name())
            .with(FieldId::InputBufferSizeMb.name(), buffer.size_components.mb)
            .with(FieldId::InputBufferSizeKb.name(), buffer.size_components.kb)
            .with(FieldId::InputBufferSizeBytes.name(), buffer.size_components.bytes)
            .with(FieldId::ElemsPerThread.name(), buffer.elems_per_thread)
            .with(FieldId::ThreadElemStride.name(), buffer.thread_elem_stride)
            .with(FieldId::GroupElemOffset.name(), buffer.group_elem_offset)
            .with(FieldId::ThreadElemOffset.name(), buffer.thread_elem_offset)
            .with(FieldId::NumThreadGroups.name(), buffer.num_thread_groups)
            .with(FieldId::ReadFromGpuMem.name(), transfer.read_from_gpu_mem)
            .with(FieldId::BufferUploadPath.name(), transfer.buffer_upload_path.name())
            .with(
                FieldId::BackgroundUploadSize.name(),
                transfer.background_upload_size_mb,
            )
            .with(
                FieldId::BackgroundUploadWaitTime.name(),
                transfer.background_upload_wait_time_ms,
            )
            .with(FieldId::EnableVSync.name(), debug.enable_vsync)
            .with(FieldId::StablePowerState.name(), debug.stable_power_state)
            .with(
                FieldId::EnableDriverBackgroundThreads.name(),
                debug.enable_driver_background_threads,
            )
    }
}

impl<K, V> FromIterator<(K, V)> for RawConfiguration
where
    K: Into<String>,
    V: Into<RawValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut raw = Self::new();
        for (name, value) in iter {
            raw.set(name, value);
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_parse() {
        assert_eq!(RawValue::parse("42"), RawValue::Integer(42));
        assert_eq!(RawValue::parse(" -7 "), RawValue::Integer(-7));
        assert_eq!(RawValue::parse("TRUE"), RawValue::Boolean(true));
        assert_eq!(RawValue::parse("false"), RawValue::Boolean(false));
        assert_eq!(RawValue::parse("GPU Upload"), RawValue::Text("GPU Upload".into()));
        assert_eq!(RawValue::parse("1e3"), RawValue::Text("1e3".into()));
    }

    #[test]
    fn test_raw_value_parse_saturates() {
        assert_eq!(
            RawValue::parse("99999999999999999999"),
            RawValue::Integer(i64::MAX)
        );
        assert_eq!(
            RawValue::parse("-99999999999999999999"),
            RawValue::Integer(i64::MIN)
        );
        assert_eq!(
            RawValue::parse("+99999999999999999999"),
            RawValue::Integer(i64::MAX)
        );
        assert_eq!(parse_integer("12x"), None);
        assert_eq!(parse_integer("-"), None);
    }

    #[test]
    fn test_raw_value_display() {
        assert_eq!(RawValue::Integer(-1).to_string(), "-1");
        assert_eq!(RawValue::Boolean(true).to_string(), "true");
        assert_eq!(RawValue::from("L0").to_string(), "L0");
    }

    #[test]
    fn test_builder_and_accessors() {
        let mut raw = RawConfiguration::new()
            .with("HeapType", "Default")
            .with("NumThreadGroups", 128)
            .with("EnableVSync", false);
        assert_eq!(raw.len(), 3);
        assert!(raw.contains("HeapType"));
        assert_eq!(raw.get("NumThreadGroups"), Some(&RawValue::Integer(128)));

        raw.set("NumThreadGroups", 256);
        assert_eq!(raw.get("NumThreadGroups"), Some(&RawValue::Integer(256)));

        assert_eq!(raw.remove("EnableVSync"), Some(RawValue::Boolean(false)));
        assert_eq!(raw.len(), 2);
        assert!(!raw.is_empty());
    }

    #[test]
    fn test_iter_is_name_ordered() {
        let raw: RawConfiguration = [("b", 1), ("a", 2), ("c", 3)].into_iter().collect();
        let names: Vec<&str> = raw.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_parse_assignment() {
        let (name, value) = RawConfiguration::parse_assignment("InputBufferSizeMB=64").unwrap();
        assert_eq!(name, "InputBufferSizeMB");
        assert_eq!(value, RawValue::Integer(64));

        let (name, value) = RawConfiguration::parse_assignment(" HeapType = GPU Upload").unwrap();
        assert_eq!(name, "HeapType");
        assert_eq!(value, RawValue::Text("GPU Upload".into()));
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(matches!(
            RawConfiguration::parse_assignment("HeapType"),
            Err(MempoolError::Config(_))
        ));
        assert!(matches!(
            RawConfiguration::parse_assignment("=5"),
            Err(MempoolError::Config(_))
        ));
    }

    #[test]
    fn test_from_assignments_last_wins() {
        let raw =
            RawConfiguration::from_assignments(["NumThreadGroups=1", "NumThreadGroups=2"]).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.get("NumThreadGroups"), Some(&RawValue::Integer(2)));
    }
}
