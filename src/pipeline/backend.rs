//! Compiler Backend Adapter
//!
//! [`CompilerBackend`] turns one flattened shader into bytecode by calling a
//! [`Toolchain`]: the external compiler capability. The adapter owns the
//! fixed argument list and appends the framework-internal definitions that
//! every shader may test for:
//!
//! | Definition | Value                                  |
//! |------------|----------------------------------------|
//! | `DXC_`     | `1`                                    |
//! | `SM60_`    | `1`                                    |
//! | `HLSL_`    | `1`                                    |
//! | `Library_` | `1` for library units, `0` otherwise   |
//!
//! The adapter is stateless per call and never retries; retry policy lives
//! with the caller (see [`crate::registry`]).

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use super::cache_key::CompilerFingerprint;
use super::defines::{DefinitionSet, NativeDefines};
use super::stage::ShaderStage;
use crate::config::{CompilerConfig, ShaderModel};
use crate::errors::{Result, ShaderError};

/// Everything a toolchain needs for one compile.
#[derive(Debug)]
pub struct ToolchainInvocation<'a> {
    /// Flattened source text.
    pub source: &'a str,
    /// Root file the source came from, for diagnostics.
    pub source_path: &'a Path,
    pub entry_point: Option<&'a str>,
    pub profile: &'a str,
    /// User definitions followed by the internal ones.
    pub defines: NativeDefines,
    pub arguments: &'a [String],
}

/// Why a toolchain call produced no bytecode.
#[derive(Debug)]
pub enum ToolchainFailure {
    /// The compiler ran and rejected the shader.
    Diagnostic(String),
    /// The compiler couldn't be run or its output couldn't be read.
    Io(io::Error),
}

impl fmt::Display for ToolchainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diagnostic(message) => f.write_str(message),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl From<io::Error> for ToolchainFailure {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

pub type ToolchainResult = std::result::Result<Vec<u8>, ToolchainFailure>;

/// External, versioned compiler capability.
pub trait Toolchain: Send + Sync {
    /// Hash identifying this exact compiler build.
    fn fingerprint(&self) -> CompilerFingerprint;

    fn invoke(&self, invocation: &ToolchainInvocation<'_>) -> ToolchainResult;
}

/// One unit of work for [`CompilerBackend::compile`].
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub path: &'a Path,
    pub source: &'a str,
    pub entry_point: Option<&'a str>,
    pub stage: ShaderStage,
    pub definitions: &'a DefinitionSet,
}

/// Builds the fixed argument list for `compiler`, with `include_root` as the
/// include search path.
pub fn fixed_arguments(compiler: &CompilerConfig, include_root: &Path) -> Result<Vec<String>> {
    let include_root = std::path::absolute(include_root)?;

    let mut arguments: Vec<String> = ["-O3", "-all_resources_bound", "-WX", "-HV"]
        .into_iter()
        .map(String::from)
        .collect();
    arguments.push(compiler.language_version.to_string());
    arguments.extend(["-enable-16bit-types", "-Zpr", "-I"].map(String::from));
    arguments.push(include_root.to_string_lossy().into_owned());

    if compiler.debug_info {
        arguments.extend(["-Zi", "-Qembed_debug"].map(String::from));
    }
    Ok(arguments)
}

#[must_use]
pub fn internal_definitions(stage: ShaderStage) -> [(&'static str, &'static str); 4] {
    [
        ("DXC_", "1"),
        ("SM60_", "1"),
        ("HLSL_", "1"),
        ("Library_", if stage.is_library() { "1" } else { "0" }),
    ]
}

/// Stateless adapter around a [`Toolchain`].
#[derive(Clone)]
pub struct CompilerBackend {
    toolchain: Arc<dyn Toolchain>,
    arguments: Vec<String>,
    shader_model: ShaderModel,
}

impl fmt::Debug for CompilerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerBackend")
            .field("fingerprint", &self.toolchain.fingerprint())
            .field("arguments", &self.arguments)
            .field("shader_model", &self.shader_model)
            .finish()
    }
}

impl CompilerBackend {
    pub fn new(
        toolchain: Arc<dyn Toolchain>,
        compiler: &CompilerConfig,
        include_root: &Path,
    ) -> Result<Self> {
        Ok(Self {
            toolchain,
            arguments: fixed_arguments(compiler, include_root)?,
            shader_model: compiler.shader_model,
        })
    }

    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> CompilerFingerprint {
        self.toolchain.fingerprint()
    }

    /// Toolchain fingerprint combined with the fixed argument list; this is
    /// what cache keys are built against.
    #[must_use]
    pub fn build_fingerprint(&self) -> CompilerFingerprint {
        self.fingerprint().with_arguments(&self.arguments)
    }

    #[inline]
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    #[inline]
    #[must_use]
    pub fn profile(&self, stage: ShaderStage) -> String {
        stage.profile(self.shader_model)
    }

    /// Compiles one request, returning bytecode or a `Toolchain` error
    /// carrying the compiler's diagnostic.
    pub fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<u8>> {
        let profile = self.profile(request.stage);
        let defines = request
            .definitions
            .to_native_view_with(&internal_definitions(request.stage))?;

        let invocation = ToolchainInvocation {
            source: request.source,
            source_path: request.path,
            entry_point: request.entry_point,
            profile: &profile,
            defines,
            arguments: &self.arguments,
        };

        self.toolchain
            .invoke(&invocation)
            .map_err(|failure| match failure {
                ToolchainFailure::Diagnostic(diagnostic) => ShaderError::Toolchain {
                    path: request.path.to_path_buf(),
                    diagnostic,
                },
                ToolchainFailure::Io(err) => ShaderError::Io(err),
            })
    }
}
