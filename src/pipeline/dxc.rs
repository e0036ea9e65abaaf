//! Process-based [`Toolchain`] driving an external `dxc` executable.
//!
//! The flattened source is written to a scratch file, compiled with `-Fo`
//! into a second scratch file, and both are removed afterwards. The
//! directory of the real shader is passed as the first `-I`, ahead of the
//! framework root, so directives left in the text for the compiler (for
//! example an indented `#include` inside `#if`) still resolve relative to
//! the shader.
//!
//! Compiler stderr becomes the diagnostic, with scratch paths rewritten to
//! the real shader path. Line numbers are not remapped: they refer to the
//! flattened text, in which every include has been spliced in place.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use log::info;
use xxhash_rust::xxh3::xxh3_64;

use super::backend::{Toolchain, ToolchainFailure, ToolchainInvocation, ToolchainResult};
use super::cache_key::CompilerFingerprint;
use crate::config::CompilerConfig;
use crate::errors::{Result, ShaderError};

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct DxcToolchain {
    executable: PathBuf,
    scratch_dir: PathBuf,
    fingerprint: CompilerFingerprint,
}

impl DxcToolchain {
    /// Locates the compiler and fingerprints its binary.
    ///
    /// Fails with `MissingFile` if the executable can't be found.
    pub fn new(config: &CompilerConfig) -> Result<Self> {
        let executable =
            resolve_executable(&config.executable).ok_or_else(|| ShaderError::MissingFile {
                path: config.executable.clone(),
                included_from: None,
            })?;
        let fingerprint = CompilerFingerprint::from_file(&executable)?;

        info!(
            "Using shader compiler {} (fingerprint {:032x})",
            executable.display(),
            fingerprint.value()
        );

        let scratch_dir = config
            .scratch_dir
            .clone()
            .unwrap_or_else(|| env::temp_dir().join("shader-forge"));

        Ok(Self {
            executable,
            scratch_dir,
            fingerprint,
        })
    }

    #[inline]
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn command(
        &self,
        invocation: &ToolchainInvocation<'_>,
        source_dir: &Path,
        input: &Path,
        output: &Path,
    ) -> Command {
        let mut command = Command::new(&self.executable);
        command.arg("-I").arg(source_dir);
        command.args(invocation.arguments);
        command.arg("-T").arg(invocation.profile);
        if let Some(entry_point) = invocation.entry_point {
            command.arg("-E").arg(entry_point);
        }
        for (name, value) in invocation.defines.iter() {
            command.arg("-D").arg(format!("{name}={value}"));
        }
        command.arg("-Fo").arg(output).arg(input);
        command
    }
}

impl Toolchain for DxcToolchain {
    fn fingerprint(&self) -> CompilerFingerprint {
        self.fingerprint
    }

    fn invoke(&self, invocation: &ToolchainInvocation<'_>) -> ToolchainResult {
        fs::create_dir_all(&self.scratch_dir)?;

        let stem = format!(
            "{:016x}-{}-{}",
            xxh3_64(invocation.source.as_bytes()),
            std::process::id(),
            SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let scratch = ScratchFiles {
            input: self.scratch_dir.join(format!("{stem}.hlsl")),
            output: self.scratch_dir.join(format!("{stem}.bin")),
        };

        let source_dir = source_directory(invocation.source_path)?;
        fs::write(&scratch.input, invocation.source)?;
        let result = self
            .command(invocation, &source_dir, &scratch.input, &scratch.output)
            .output()?;

        if result.status.success() {
            return Ok(fs::read(&scratch.output)?);
        }

        let mut diagnostic = String::from_utf8_lossy(&result.stderr).into_owned();
        if diagnostic.trim().is_empty() {
            diagnostic = String::from_utf8_lossy(&result.stdout).into_owned();
        }
        if diagnostic.trim().is_empty() {
            diagnostic = format!("compiler exited with {}", result.status);
        }
        let diagnostic = diagnostic.replace(
            scratch.input.to_string_lossy().as_ref(),
            invocation.source_path.to_string_lossy().as_ref(),
        );
        Err(ToolchainFailure::Diagnostic(diagnostic))
    }
}

/// Removes the staged input and output on drop.
struct ScratchFiles {
    input: PathBuf,
    output: PathBuf,
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.input);
        let _ = fs::remove_file(&self.output);
    }
}

/// Absolute directory containing `source_path`.
fn source_directory(source_path: &Path) -> io::Result<PathBuf> {
    match source_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::path::absolute(dir),
        _ => env::current_dir(),
    }
}

/// A path with a directory component is used as-is; a bare name is searched
/// for on `PATH`.
fn resolve_executable(executable: &Path) -> Option<PathBuf> {
    if executable.components().count() > 1 || executable.is_absolute() {
        return executable.is_file().then(|| executable.to_path_buf());
    }

    let search = env::var_os("PATH")?;
    env::split_paths(&search).find_map(|dir| {
        let candidate = dir.join(executable);
        if candidate.is_file() {
            return Some(candidate);
        }
        let with_exe = candidate.with_extension(env::consts::EXE_EXTENSION);
        (cfg!(windows) && with_exe.is_file()).then_some(with_exe)
    })
}
