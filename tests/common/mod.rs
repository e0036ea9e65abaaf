//! Shared fixtures: a scratch shader tree and a fake toolchain.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use shader_forge::pipeline::{ToolchainFailure, ToolchainInvocation, ToolchainResult};
use shader_forge::{
    CompilerFingerprint, OptionProvider, RetryPolicy, ShaderConfig, ShaderRegistry, Toolchain,
};
use tempfile::TempDir;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// FakeToolchain
// ============================================================================

/// Deterministic stand-in for the external compiler.
///
/// "Bytecode" is a readable dump of the invocation, so any change to the
/// source, profile, entry point or definitions changes the output.
pub struct FakeToolchain {
    fingerprint: CompilerFingerprint,
    calls: AtomicUsize,
    failures_left: AtomicUsize,
}

impl FakeToolchain {
    pub fn new() -> Arc<Self> {
        Self::with_fingerprint(0xF00D)
    }

    pub fn with_fingerprint(value: u128) -> Arc<Self> {
        Arc::new(Self {
            fingerprint: CompilerFingerprint::from_raw(value),
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
        })
    }

    /// Number of `invoke` calls so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes the next `count` invocations report a diagnostic.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }
}

impl Toolchain for FakeToolchain {
    fn fingerprint(&self) -> CompilerFingerprint {
        self.fingerprint
    }

    fn invoke(&self, invocation: &ToolchainInvocation<'_>) -> ToolchainResult {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ToolchainFailure::Diagnostic(format!(
                "{}(1,1): error X3000: syntax error",
                invocation.source_path.display()
            )));
        }

        let defines: Vec<String> = invocation
            .defines
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        let dump = format!(
            "DXIL|{}|{}|{}|{}",
            invocation.profile,
            invocation.entry_point.unwrap_or("-"),
            defines.join(","),
            invocation.source
        );
        Ok(dump.into_bytes())
    }
}

// ============================================================================
// ShaderTree
// ============================================================================

/// Temporary directory holding app shaders, framework shaders and a cache.
pub struct ShaderTree {
    dir: TempDir,
}

impl ShaderTree {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("framework")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn framework_dir(&self) -> PathBuf {
        self.root().join("framework")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root().join("cache")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    /// Rewrites `name` and pushes its mtime well past the current baseline,
    /// independent of filesystem timestamp resolution.
    pub fn edit(&self, name: &str, contents: &str, seconds_ahead: u64) -> PathBuf {
        let path = self.write(name, contents);
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(seconds_ahead))
            .unwrap();
        path
    }

    pub fn config(&self) -> ShaderConfig {
        ShaderConfig::default()
            .with_cache_dir(self.cache_dir())
            .with_build_tag("Test")
            .with_framework_shader_dir(self.framework_dir())
            .with_retry(RetryPolicy {
                max_attempts: 3,
                delay_ms: 0,
            })
    }

    pub fn registry(
        &self,
        toolchain: &Arc<FakeToolchain>,
        options: Arc<dyn OptionProvider>,
    ) -> ShaderRegistry {
        ShaderRegistry::new(self.config(), toolchain.clone(), options).unwrap()
    }

    /// Number of `.cache` files currently stored.
    pub fn cache_entries(&self) -> usize {
        let dir = self.cache_dir().join("Test");
        match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "cache"))
                .count(),
            Err(_) => 0,
        }
    }
}
