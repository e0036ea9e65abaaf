//! Compile-time option providers.
//!
//! Shaders that include the configured marker file (`AppSettings.hlsl` by
//! default) get the provider's definitions appended to their own, and are
//! recompiled whenever the provider reports a change.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::defines::DefinitionSet;
use crate::errors::Result;

/// Source of dynamic compile-time definitions.
pub trait OptionProvider: Send + Sync {
    /// Definitions to append for option-dependent shaders.
    fn compile_options(&self) -> DefinitionSet;

    /// Whether the definitions changed since the previous call.
    ///
    /// Calling this consumes the change; the next call returns `false` until
    /// something changes again.
    fn options_changed(&self) -> bool;
}

/// Provider for applications without dynamic options.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOptions;

impl OptionProvider for NoOptions {
    fn compile_options(&self) -> DefinitionSet {
        DefinitionSet::new()
    }

    fn options_changed(&self) -> bool {
        false
    }
}

/// Thread-safe settings store usable as an [`OptionProvider`].
///
/// A settings UI calls [`set`](Self::set) whenever a value is edited; the
/// hot-reload tick picks up the change on the next frame.
#[derive(Debug, Default)]
pub struct SharedOptions {
    values: Mutex<DefinitionSet>,
    dirty: AtomicBool,
}

impl SharedOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, keeping the position of an existing entry.
    ///
    /// Only an actual change of value marks the options dirty.
    pub fn set(&self, name: &str, value: impl Display) -> Result<()> {
        let value = value.to_string();
        let mut values = self.values.lock();

        if values.get(name) == Some(value.as_str()) {
            return Ok(());
        }

        let mut updated = DefinitionSet::new();
        let mut replaced = false;
        for (key, existing) in values.iter() {
            if key == name {
                updated.add(key, &value)?;
                replaced = true;
            } else {
                updated.add(key, existing)?;
            }
        }
        if !replaced {
            updated.add(name, &value)?;
        }

        *values = updated;
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.values.lock().get(name).map(str::to_string)
    }
}

impl OptionProvider for SharedOptions {
    fn compile_options(&self) -> DefinitionSet {
        self.values.lock().clone()
    }

    fn options_changed(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_marks_dirty_once() {
        let options = SharedOptions::new();
        assert!(!options.options_changed());

        options.set("DiscardMode_", 1).unwrap();
        assert!(options.options_changed());
        assert!(!options.options_changed());
    }

    #[test]
    fn same_value_is_not_a_change() {
        let options = SharedOptions::new();
        options.set("ForceEarlyZ_", 0).unwrap();
        let _ = options.options_changed();

        options.set("ForceEarlyZ_", 0).unwrap();
        assert!(!options.options_changed());
    }

    #[test]
    fn update_keeps_position() {
        let options = SharedOptions::new();
        options.set("DiscardMode_", 0).unwrap();
        options.set("DepthExportMode_", 0).unwrap();
        options.set("DiscardMode_", 2).unwrap();

        assert_eq!(
            options.compile_options().serialize(),
            "DiscardMode_=2|DepthExportMode_=0"
        );
        assert_eq!(options.get("DiscardMode_").as_deref(), Some("2"));
    }

    #[test]
    fn no_options_never_changes() {
        assert!(NoOptions.compile_options().is_empty());
        assert!(!NoOptions.options_changed());
    }
}
