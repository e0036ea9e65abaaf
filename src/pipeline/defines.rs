//! Shader Definition Sets
//!
//! A [`DefinitionSet`] is the list of preprocessor `name=value` pairs that
//! selects one permutation of a shader.
//!
//! Unlike a map, the set keeps **insertion order**: that order is exactly the
//! order used by [`DefinitionSet::serialize`], and the serialized string is
//! part of the cache key. Two sets holding the same pairs in a different
//! order therefore address different cache entries, which is harmless (an
//! extra compile) and keeps serialization trivially deterministic.
//!
//! # Usage
//!
//! ```rust,ignore
//! use shader_forge::DefinitionSet;
//!
//! let mut defines = DefinitionSet::new();
//! defines.add("MSAA_", 4)?;
//! defines.add("UseNormalMapping_", 1)?;
//!
//! assert_eq!(defines.serialize(), "MSAA_=4|UseNormalMapping_=1");
//! ```

use std::ffi::{CString, c_char};
use std::fmt::{self, Display};
use std::ptr;

use smallvec::SmallVec;

use crate::errors::{Result, ShaderError};

/// Maximum number of definitions a single set may hold.
pub const MAX_DEFINES: usize = 64;

/// Separator between `name=value` pairs in the serialized form.
pub const SERIALIZE_SEPARATOR: char = '|';

/// Ordered, bounded collection of shader definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DefinitionSet {
    defines: SmallVec<[(String, String); 8]>,
}

impl DefinitionSet {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            defines: SmallVec::new(),
        }
    }

    /// Creates a set holding a single definition.
    pub fn with(name: &str, value: impl Display) -> Result<Self> {
        let mut defines = Self::new();
        defines.add(name, value)?;
        Ok(defines)
    }

    /// Appends a definition.
    ///
    /// Names are not deduplicated; adding the same name twice keeps both
    /// entries and the compiler sees the last one.
    pub fn add(&mut self, name: &str, value: impl Display) -> Result<()> {
        if self.defines.len() >= MAX_DEFINES {
            return Err(ShaderError::Capacity { max: MAX_DEFINES });
        }

        let value = value.to_string();
        if name.contains('\0') || value.contains('\0') {
            return Err(ShaderError::InvalidDefinition {
                name: name.replace('\0', "\\0"),
            });
        }

        self.defines.push((name.to_string(), value));
        Ok(())
    }

    /// Appends every definition of `other`, in order.
    pub fn extend_from(&mut self, other: &DefinitionSet) -> Result<()> {
        if self.defines.len() + other.defines.len() > MAX_DEFINES {
            return Err(ShaderError::Capacity { max: MAX_DEFINES });
        }
        self.defines.extend(other.defines.iter().cloned());
        Ok(())
    }

    /// Value of the last definition named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.defines
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.defines.iter().any(|(key, _)| key == name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    pub fn clear(&mut self) {
        self.defines.clear();
    }

    /// Iterate definitions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.defines
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// `name=value` pairs joined by `|`, in insertion order.
    ///
    /// This exact string participates in the cache key.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.defines {
            if !out.is_empty() {
                out.push(SERIALIZE_SEPARATOR);
            }
            out.push_str(name);
            out.push('=');
            out.push_str(value);
        }
        out
    }

    /// Null-terminated array-of-pairs view for a native compiler interface.
    pub fn to_native_view(&self) -> Result<NativeDefines> {
        NativeDefines::from_pairs(self.iter())
    }

    /// Like [`Self::to_native_view`], with `extra` appended after this set's
    /// own definitions.
    ///
    /// The extra pairs don't count against [`MAX_DEFINES`].
    pub fn to_native_view_with(&self, extra: &[(&str, &str)]) -> Result<NativeDefines> {
        NativeDefines::from_pairs(self.iter().chain(extra.iter().copied()))
    }
}

impl Display for DefinitionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

// ─── Native View ─────────────────────────────────────────────────────────────

/// One `(name, value)` entry of a [`NativeDefines`] table.
///
/// Layout-compatible with the `{ const char* Name; const char* Definition; }`
/// macro structs used by C compiler interfaces.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawDefine {
    pub name: *const c_char,
    pub value: *const c_char,
}

impl RawDefine {
    const TERMINATOR: Self = Self {
        name: ptr::null(),
        value: ptr::null(),
    };

    #[inline]
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        self.name.is_null()
    }
}

/// Owned C strings plus a pointer table terminated by a null pair.
///
/// The table borrows the heap buffers of `strings`; those buffers don't move
/// when the `NativeDefines` itself is moved, so the pointers stay valid for
/// the lifetime of the value.
#[derive(Debug)]
pub struct NativeDefines {
    strings: Vec<(CString, CString)>,
    table: Vec<RawDefine>,
}

impl NativeDefines {
    fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut strings = Vec::new();
        for (name, value) in pairs {
            let invalid = || ShaderError::InvalidDefinition {
                name: name.replace('\0', "\\0"),
            };
            let name_c = CString::new(name).map_err(|_| invalid())?;
            let value_c = CString::new(value).map_err(|_| invalid())?;
            strings.push((name_c, value_c));
        }

        let table = strings
            .iter()
            .map(|(name, value)| RawDefine {
                name: name.as_ptr(),
                value: value.as_ptr(),
            })
            .chain(std::iter::once(RawDefine::TERMINATOR))
            .collect();

        Ok(Self { strings, table })
    }

    /// Pointer to the first entry; the table ends with a null pair.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const RawDefine {
        self.table.as_ptr()
    }

    /// The full table, terminator included.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &[RawDefine] {
        &self.table
    }

    /// Number of definitions, terminator excluded.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.strings.iter().map(|(name, value)| {
            (
                name.to_str().unwrap_or_default(),
                value.to_str().unwrap_or_default(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn serialize_keeps_insertion_order() {
        let mut defines = DefinitionSet::new();
        defines.add("B_", 1).unwrap();
        defines.add("A_", "two").unwrap();
        defines.add("C_", 3u32).unwrap();

        assert_eq!(defines.serialize(), "B_=1|A_=two|C_=3");
    }

    #[test]
    fn empty_set_serializes_to_empty_string() {
        assert_eq!(DefinitionSet::new().serialize(), "");
    }

    #[test]
    fn order_is_significant_for_equality() {
        let mut d1 = DefinitionSet::new();
        d1.add("A", 1).unwrap();
        d1.add("B", 2).unwrap();

        let mut d2 = DefinitionSet::new();
        d2.add("B", 2).unwrap();
        d2.add("A", 1).unwrap();

        assert_ne!(d1, d2);
        assert_ne!(d1.serialize(), d2.serialize());
    }

    #[test]
    fn add_fails_past_capacity() {
        let mut defines = DefinitionSet::new();
        for i in 0..MAX_DEFINES {
            defines.add(&format!("D{i}"), i).unwrap();
        }

        let err = defines.add("OneTooMany", 1).unwrap_err();
        assert!(matches!(err, ShaderError::Capacity { max: MAX_DEFINES }));
        assert_eq!(defines.len(), MAX_DEFINES);
    }

    #[test]
    fn extend_checks_combined_capacity() {
        let mut full = DefinitionSet::new();
        for i in 0..MAX_DEFINES {
            full.add(&format!("D{i}"), i).unwrap();
        }

        let mut one = DefinitionSet::with("X", 1).unwrap();
        assert!(matches!(
            one.extend_from(&full),
            Err(ShaderError::Capacity { .. })
        ));
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn nul_bytes_are_rejected() {
        let mut defines = DefinitionSet::new();
        assert!(matches!(
            defines.add("BAD\0NAME", 1),
            Err(ShaderError::InvalidDefinition { .. })
        ));
        assert!(defines.is_empty());
    }

    #[test]
    fn get_returns_last_value() {
        let mut defines = DefinitionSet::new();
        defines.add("MODE", 1).unwrap();
        defines.add("MODE", 2).unwrap();

        assert_eq!(defines.get("MODE"), Some("2"));
        assert!(defines.contains("MODE"));
        assert_eq!(defines.get("OTHER"), None);
    }

    #[test]
    fn native_view_is_null_terminated() {
        let mut defines = DefinitionSet::new();
        defines.add("A_", 1).unwrap();
        defines.add("B_", 0).unwrap();

        let native = defines.to_native_view_with(&[("Library_", "1")]).unwrap();
        assert_eq!(native.len(), 3);

        let raw = native.raw();
        assert_eq!(raw.len(), 4);
        assert!(raw[3].is_terminator());
        assert!(raw[3].value.is_null());

        // SAFETY: the table entries point into `native`, which is alive.
        let name = unsafe { CStr::from_ptr(raw[2].name) };
        assert_eq!(name.to_str().unwrap(), "Library_");

        let pairs: Vec<_> = native.iter().collect();
        assert_eq!(pairs, [("A_", "1"), ("B_", "0"), ("Library_", "1")]);
    }
}
