//! Pipeline Configuration
//!
//! This module defines the knobs of the shader build-and-cache pipeline.
//!
//! [`ShaderConfig`] is plain data: it can be built in code, or loaded from a
//! JSON file so that tools and apps share one set of cache/toolchain paths.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use shader_forge::config::{ShaderConfig, RetryPolicy};
//!
//! // Defaults: ./ShaderCache/<Debug|Release>, `dxc` from PATH
//! let config = ShaderConfig::default();
//!
//! // Or override selected fields
//! let config = ShaderConfig::default()
//!     .with_cache_dir("target/shader-cache")
//!     .with_framework_shader_dir("assets/shaders");
//!
//! // Or load from disk (missing fields keep their defaults)
//! let config = ShaderConfig::from_json_file("shaders.json")?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

// ---------------------------------------------------------------------------
// ShaderModel
// ---------------------------------------------------------------------------

/// Shader model targeted by all profile strings (`vs_6_8`, `ps_6_8`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderModel {
    pub major: u32,
    pub minor: u32,
}

impl ShaderModel {
    pub const SM_6_8: Self = Self { major: 6, minor: 8 };
    pub const SM_6_9: Self = Self { major: 6, minor: 9 };
}

impl Default for ShaderModel {
    #[inline]
    fn default() -> Self {
        if cfg!(feature = "preview-shader-model") {
            Self::SM_6_9
        } else {
            Self::SM_6_8
        }
    }
}

impl fmt::Display for ShaderModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.major, self.minor)
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How hot-reload recompiles react to retryable failures.
///
/// Text editors frequently hold a file open for a few milliseconds after
/// saving, so a recompile triggered by a timestamp change may fail once or
/// twice before the file becomes readable again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1000,
            delay_ms: 15,
        }
    }
}

impl RetryPolicy {
    #[inline]
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

// ---------------------------------------------------------------------------
// CompilerConfig
// ---------------------------------------------------------------------------

/// Settings for the external compiler toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Compiler executable. A bare name is looked up on `PATH`.
    pub executable: PathBuf,
    pub shader_model: ShaderModel,
    /// HLSL language revision passed as `-HV`.
    pub language_version: u32,
    /// Embed debug information (`-Zi -Qembed_debug`).
    pub debug_info: bool,
    /// Where flattened sources and outputs are staged for the toolchain.
    /// Defaults to the system temp directory.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("dxc"),
            shader_model: ShaderModel::default(),
            language_version: 2021,
            debug_info: cfg!(debug_assertions),
            scratch_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ShaderConfig
// ---------------------------------------------------------------------------

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Root of the on-disk cache.
    pub cache_dir: PathBuf,
    /// Build-configuration subdirectory below `cache_dir`.
    pub build_tag: String,
    /// Root for angle-bracket includes (`#include <Common.hlsl>`), also passed
    /// to the toolchain as its include search path.
    pub framework_shader_dir: PathBuf,
    /// File name whose inclusion marks a shader as depending on the option
    /// provider.
    pub options_marker: String,
    pub retry: RetryPolicy,
    pub compiler: CompilerConfig,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("ShaderCache"),
            build_tag: default_build_tag().to_string(),
            framework_shader_dir: PathBuf::from("Shaders"),
            options_marker: "AppSettings.hlsl".to_string(),
            retry: RetryPolicy::default(),
            compiler: CompilerConfig::default(),
        }
    }
}

/// `Debug` or `Release`, matching the profile this crate was built with.
#[must_use]
pub fn default_build_tag() -> &'static str {
    if cfg!(debug_assertions) {
        "Debug"
    } else {
        "Release"
    }
}

impl ShaderConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_build_tag(mut self, tag: impl Into<String>) -> Self {
        self.build_tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_framework_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.framework_shader_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_options_marker(mut self, file_name: impl Into<String>) -> Self {
        self.options_marker = file_name.into();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: CompilerConfig) -> Self {
        self.compiler = compiler;
        self
    }

    /// `<cache_dir>/<build_tag>`
    #[must_use]
    pub fn cache_subdir(&self) -> PathBuf {
        self.cache_dir.join(&self.build_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_build_profile() {
        let config = ShaderConfig::default();
        assert_eq!(config.build_tag, default_build_tag());
        assert_eq!(config.compiler.debug_info, cfg!(debug_assertions));
        assert_eq!(config.retry.max_attempts, 1000);
        assert_eq!(config.retry.delay(), Duration::from_millis(15));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ShaderConfig::from_json_str(
            r#"{ "cache_dir": "out/cache", "retry": { "max_attempts": 3 } }"#,
        )
        .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("out/cache"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_ms, 15);
        assert_eq!(config.options_marker, "AppSettings.hlsl");
        assert_eq!(config.compiler.executable, PathBuf::from("dxc"));
    }

    #[test]
    fn cache_subdir_appends_build_tag() {
        let config = ShaderConfig::default()
            .with_cache_dir("cache")
            .with_build_tag("Profile");
        assert_eq!(config.cache_subdir(), PathBuf::from("cache").join("Profile"));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let retry = RetryPolicy {
            max_attempts: 0,
            delay_ms: 0,
        };
        assert_eq!(retry.attempts(), 1);
    }

    #[test]
    fn shader_model_formats_as_profile_suffix() {
        assert_eq!(ShaderModel::SM_6_8.to_string(), "6_8");
    }
}
