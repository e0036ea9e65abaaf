//! Shader Registry
//!
//! [`ShaderRegistry`] is the service that owns every compiled shader and the
//! file → dependents map used for hot reload.
//!
//! # Compile flow
//!
//! ```text
//! compile_from_file(path, entry, stage, base options)
//!   → IncludeExpander      flattened text + touched files
//!   → OptionProvider       only if the marker file was touched
//!   → CacheKeyGenerator    key over text, entry, profile, definitions
//!   → DiskCache            hit: done / miss: CompilerBackend, then store
//!   → FileTable            register the shader with every touched file
//! ```
//!
//! # Locking
//!
//! The file table and the shader list sit behind two independent mutexes.
//! Each is held only for a single lookup or insert; include expansion, cache
//! I/O and the toolchain call all run unlocked, so compile requests from
//! loader threads don't stall the frame thread's [`tick`](ShaderRegistry::tick).

mod compiled;
mod hot_reload;
mod policy;
mod source_file;

pub use compiled::{CompiledShader, ShaderDesc, ShaderHandle, ShaderSnapshot};
pub use policy::{AbortOnError, CompileErrorHandler, ErrorAction};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use log::{debug, error, info};
use parking_lot::Mutex;

use crate::config::ShaderConfig;
use crate::errors::{Result, ShaderError};
use crate::pipeline::{
    CacheKeyGenerator, CacheKeyInputs, CompileRequest, CompilerBackend, CompilerFingerprint,
    DefinitionSet, DiskCache, IncludeExpander, OptionProvider, ShaderStage, Toolchain,
};
use source_file::FileTable;

pub struct ShaderRegistry {
    config: ShaderConfig,
    expander: IncludeExpander,
    keys: CacheKeyGenerator,
    cache: DiskCache,
    backend: CompilerBackend,
    options: Arc<dyn OptionProvider>,
    error_handler: Box<dyn CompileErrorHandler>,

    files: Mutex<FileTable>,
    shaders: Mutex<Vec<ShaderHandle>>,
    /// Round-robin position of the hot-reload poll.
    cursor: AtomicUsize,
}

impl ShaderRegistry {
    /// Initializes the pipeline.
    ///
    /// The compiler fingerprint is read from `toolchain` once, here, and
    /// folded with the compiler arguments; every key computed by this
    /// registry is combined with the result.
    pub fn new(
        config: ShaderConfig,
        toolchain: Arc<dyn Toolchain>,
        options: Arc<dyn OptionProvider>,
    ) -> Result<Self> {
        let backend =
            CompilerBackend::new(toolchain, &config.compiler, &config.framework_shader_dir)?;
        let keys = CacheKeyGenerator::new(backend.build_fingerprint());
        let cache = DiskCache::new(config.cache_subdir());
        let expander = IncludeExpander::new(&config.framework_shader_dir);

        info!(
            "Shader registry ready: cache {}, framework shaders {}",
            cache.dir().display(),
            config.framework_shader_dir.display()
        );

        Ok(Self {
            config,
            expander,
            keys,
            cache,
            backend,
            options,
            error_handler: Box::new(AbortOnError),
            files: Mutex::new(FileTable::default()),
            shaders: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
        })
    }

    /// Replaces the initial-compile error handler (default: [`AbortOnError`]).
    #[must_use]
    pub fn with_error_handler(mut self, handler: impl CompileErrorHandler + 'static) -> Self {
        self.error_handler = Box::new(handler);
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ShaderConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn disk_cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Compiler fingerprint, arguments included, that every key of this
    /// registry is combined with.
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> CompilerFingerprint {
        self.keys.fingerprint()
    }

    /// Compiles `path` and registers the result for hot reload.
    ///
    /// Blocks until the bytecode comes from the cache or the toolchain.
    /// Toolchain failures are routed through the [`CompileErrorHandler`];
    /// all other failures are returned immediately.
    pub fn compile_from_file(
        &self,
        path: impl AsRef<Path>,
        entry_point: Option<&str>,
        stage: ShaderStage,
        base_options: &DefinitionSet,
    ) -> Result<ShaderHandle> {
        let desc = ShaderDesc::new(path.as_ref(), entry_point, stage)?;
        let shader = Arc::new(CompiledShader::new(desc, base_options.clone()));

        loop {
            match self.compile_shader(&shader) {
                Ok(()) => break,
                Err(ShaderError::Toolchain { path, diagnostic }) => {
                    error!("Error compiling shader file \"{}\" - {diagnostic}", path.display());
                    match self.error_handler.on_toolchain_error(shader.desc(), &diagnostic) {
                        ErrorAction::Retry => continue,
                        ErrorAction::Abort => return Err(ShaderError::Aborted { path, diagnostic }),
                    }
                }
                Err(err) => return Err(err),
            }
        }

        self.shaders.lock().push(shader.clone());
        Ok(shader)
    }

    /// One full compile attempt for `shader`: expand, key, cache or compile,
    /// install the bytecode and record file dependencies.
    pub(crate) fn compile_shader(&self, shader: &ShaderHandle) -> Result<()> {
        let expanded = self.expander.expand_file(shader.path())?;

        let uses_options = expanded.touches(&self.config.options_marker);
        let mut definitions = shader.base_options().clone();
        if uses_options {
            definitions.extend_from(&self.options.compile_options())?;
        }

        let serialized = definitions.serialize();
        let profile = self.backend.profile(shader.stage());
        let key = self.keys.key_for(&CacheKeyInputs {
            source: &expanded.text,
            entry_point: shader.entry_point(),
            profile: &profile,
            definitions: &serialized,
        });

        let bytecode = if let Some(cached) = self.cache.lookup(key)? {
            debug!("Loaded {} from cache ({key})", shader.desc());
            cached
        } else {
            info!("Compiling {} {serialized}", shader.desc());
            let bytecode = self.backend.compile(&CompileRequest {
                path: shader.path(),
                source: &expanded.text,
                entry_point: shader.entry_point(),
                stage: shader.stage(),
                definitions: &definitions,
            })?;
            self.cache.store(key, &bytecode)?;
            bytecode
        };

        shader.install(bytecode, definitions, uses_options);

        for file in &expanded.files {
            self.files.lock().register(file, shader);
        }
        self.files.lock().prune(shader, &expanded.files);
        Ok(())
    }

    #[must_use]
    pub fn shader_count(&self) -> usize {
        self.shaders.lock().len()
    }

    #[must_use]
    pub fn source_file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Every registered shader, in registration order.
    #[must_use]
    pub fn shaders(&self) -> Vec<ShaderHandle> {
        self.shaders.lock().clone()
    }

    /// Shaders whose last compile reached `path` through its includes.
    #[must_use]
    pub fn dependents_of(&self, path: impl AsRef<Path>) -> Vec<ShaderHandle> {
        let path = canonical_or_given(path.as_ref());
        self.files
            .lock()
            .find(&path)
            .map(|record| record.live_dependents())
            .unwrap_or_default()
    }

    /// Tears the registry down, releasing every record and shader it owns.
    ///
    /// Handles still held elsewhere stay valid but no longer hot reload.
    pub fn shutdown(self) {
        info!(
            "Shutting down shader registry: {} shaders, {} source files",
            self.shader_count(),
            self.source_file_count()
        );
    }
}

fn canonical_or_given(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
