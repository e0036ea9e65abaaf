//! Compiled shader entities.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::{Result, ShaderError};
use crate::pipeline::{DefinitionSet, ShaderStage};

/// Shared handle to a registered shader.
pub type ShaderHandle = Arc<CompiledShader>;

/// What a caller asked for: file, entry point and stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderDesc {
    pub path: PathBuf,
    pub entry_point: Option<String>,
    pub stage: ShaderStage,
}

impl ShaderDesc {
    /// Library units take no entry point; every other stage requires one.
    pub fn new(
        path: impl Into<PathBuf>,
        entry_point: Option<&str>,
        stage: ShaderStage,
    ) -> Result<Self> {
        let path = path.into();
        match (stage.is_library(), entry_point) {
            (true, Some(entry)) => Err(ShaderError::InvalidRequest(format!(
                "library unit {} can't have entry point {entry}",
                path.display()
            ))),
            (false, None) | (false, Some("")) => Err(ShaderError::InvalidRequest(format!(
                "{stage} shader {} needs an entry point",
                path.display()
            ))),
            _ => Ok(Self {
                path,
                entry_point: entry_point.map(str::to_string),
                stage,
            }),
        }
    }
}

impl fmt::Display for ShaderDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self
            .path
            .file_name()
            .map_or_else(|| self.path.to_string_lossy(), |name| name.to_string_lossy());
        match &self.entry_point {
            Some(entry) => write!(f, "{} shader {file}_{entry}", self.stage),
            None => write!(f, "shader library {file}"),
        }
    }
}

/// Bytecode plus the values that identify it, read atomically.
#[derive(Debug, Clone)]
pub struct ShaderSnapshot {
    pub bytecode: Arc<[u8]>,
    pub bytecode_hash: u128,
    pub revision: u64,
}

#[derive(Debug)]
struct ShaderState {
    bytecode: Arc<[u8]>,
    bytecode_hash: u128,
    definitions: DefinitionSet,
    uses_options: bool,
    revision: u64,
}

/// One compiled artifact.
///
/// Created once per compile request and kept for the lifetime of the
/// registry. Hot reload replaces the bytecode in place, so pipeline builders
/// holding a handle always see the latest version; compare
/// [`bytecode_hash`](Self::bytecode_hash) or [`revision`](Self::revision) to
/// decide whether dependent pipeline objects need rebuilding.
#[derive(Debug)]
pub struct CompiledShader {
    desc: ShaderDesc,
    base_options: DefinitionSet,
    state: RwLock<ShaderState>,
}

impl CompiledShader {
    pub(crate) fn new(desc: ShaderDesc, base_options: DefinitionSet) -> Self {
        Self {
            desc,
            state: RwLock::new(ShaderState {
                bytecode: Arc::from(Vec::new()),
                bytecode_hash: xxh3_128(&[]),
                definitions: base_options.clone(),
                uses_options: false,
                revision: 0,
            }),
            base_options,
        }
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> &ShaderDesc {
        &self.desc
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.desc.path
    }

    #[inline]
    #[must_use]
    pub fn entry_point(&self) -> Option<&str> {
        self.desc.entry_point.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.desc.stage
    }

    /// Definitions supplied with the original request.
    #[inline]
    #[must_use]
    pub fn base_options(&self) -> &DefinitionSet {
        &self.base_options
    }

    #[must_use]
    pub fn bytecode(&self) -> Arc<[u8]> {
        self.state.read().bytecode.clone()
    }

    /// xxh3-128 of the current bytecode.
    #[must_use]
    pub fn bytecode_hash(&self) -> u128 {
        self.state.read().bytecode_hash
    }

    /// Number of successful (re)compiles so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Whether the last compile pulled in the option provider's definitions.
    #[must_use]
    pub fn uses_options(&self) -> bool {
        self.state.read().uses_options
    }

    /// Full definition set used by the last compile.
    #[must_use]
    pub fn definitions(&self) -> DefinitionSet {
        self.state.read().definitions.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> ShaderSnapshot {
        let state = self.state.read();
        ShaderSnapshot {
            bytecode: state.bytecode.clone(),
            bytecode_hash: state.bytecode_hash,
            revision: state.revision,
        }
    }

    pub(crate) fn install(
        &self,
        bytecode: Vec<u8>,
        definitions: DefinitionSet,
        uses_options: bool,
    ) {
        let bytecode_hash = xxh3_128(&bytecode);
        let mut state = self.state.write();
        state.bytecode = Arc::from(bytecode);
        state.bytecode_hash = bytecode_hash;
        state.definitions = definitions;
        state.uses_options = uses_options;
        state.revision += 1;
    }
}
