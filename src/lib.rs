//! # Shader Forge
//!
//! HLSL build-and-cache pipeline: include expansion, permutation
//! definitions, a content-addressed disk cache keyed by source and compiler
//! fingerprint, and frame-driven hot reload of changed sources or options.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shader_forge::{DefinitionSet, DxcToolchain, ShaderConfig, ShaderRegistry, ShaderStage, SharedOptions};
//!
//! let config = ShaderConfig::default();
//! let toolchain = Arc::new(DxcToolchain::new(&config.compiler)?);
//! let options = Arc::new(SharedOptions::new());
//! let registry = ShaderRegistry::new(config, toolchain, options)?;
//!
//! let vs = registry.compile_from_file("Mesh.hlsl", Some("VSMain"), ShaderStage::Vertex, &DefinitionSet::new())?;
//!
//! // every frame
//! if registry.tick()? {
//!     // rebuild pipeline objects from vs.bytecode()
//! }
//! ```

pub mod config;
pub mod errors;
pub mod pipeline;
pub mod registry;

pub use config::{CompilerConfig, RetryPolicy, ShaderConfig, ShaderModel};
pub use errors::{Result, ShaderError};
pub use pipeline::{
    CacheKey, CompilerBackend, CompilerFingerprint, DefinitionSet, DiskCache, DxcToolchain,
    IncludeExpander, NoOptions, OptionProvider, ShaderStage, SharedOptions, Toolchain,
};
pub use registry::{
    AbortOnError, CompileErrorHandler, CompiledShader, ErrorAction, ShaderDesc, ShaderHandle,
    ShaderRegistry, ShaderSnapshot,
};
