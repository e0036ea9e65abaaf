//! Shader Build Pipeline
//!
//! The leaf stages of a compile request, in the order they run:
//!
//! - [`include`]: flatten `#include` directives, collect touched files
//! - [`defines`]: ordered permutation definitions
//! - [`cache_key`]: deterministic content hash of the request
//! - [`disk_cache`]: bytecode lookup / store by key
//! - [`backend`]: compiler adapter over a [`Toolchain`]
//! - [`dxc`]: process-based toolchain
//! - [`options`]: dynamic option providers
//! - [`stage`]: stage kinds and profiles

pub mod backend;
pub mod cache_key;
pub mod defines;
pub mod disk_cache;
pub mod dxc;
pub mod include;
pub mod options;
pub mod stage;

pub use backend::{
    CompileRequest, CompilerBackend, Toolchain, ToolchainFailure, ToolchainInvocation,
    ToolchainResult,
};
pub use cache_key::{
    CACHE_FORMAT_VERSION, CacheKey, CacheKeyGenerator, CacheKeyInputs, CompilerFingerprint,
};
pub use defines::{DefinitionSet, MAX_DEFINES, NativeDefines, RawDefine};
pub use disk_cache::DiskCache;
pub use dxc::DxcToolchain;
pub use include::{ExpandedSource, IncludeExpander};
pub use options::{NoOptions, OptionProvider, SharedOptions};
pub use stage::ShaderStage;
