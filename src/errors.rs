//! Error Types
//!
//! This module defines the error types used throughout the shader pipeline.
//!
//! # Overview
//!
//! The main error type [`ShaderError`] covers every failure mode of a compile
//! request:
//! - Missing or malformed source files and includes
//! - Toolchain diagnostics
//! - Definition set misuse (capacity, invalid characters)
//! - Cache and configuration I/O
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, ShaderError>`.
//!
//! ```rust,ignore
//! use shader_forge::errors::{ShaderError, Result};
//!
//! fn build() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The main error type for the shader pipeline.
#[derive(Error, Debug)]
pub enum ShaderError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// A root shader file or an `#include`d file does not exist.
    #[error("Couldn't find shader file \"{}\"{}", .path.display(), included_from_suffix(.included_from.as_ref()))]
    MissingFile {
        /// The resolved path that was looked up
        path: PathBuf,
        /// The file containing the `#include`, if any
        included_from: Option<PathBuf>,
    },

    /// An `#include` line with neither a quoted nor an angle-bracket path.
    #[error("Malformed include statement: \"{line}\" in file {}", .file.display())]
    MalformedInclude {
        /// The offending line, trimmed
        line: String,
        /// The file containing the line
        file: PathBuf,
    },

    // ========================================================================
    // Toolchain Errors
    // ========================================================================
    /// The compiler toolchain rejected the shader.
    #[error("Error compiling shader file \"{}\" - {diagnostic}", .path.display())]
    Toolchain {
        /// Root shader file of the failed compile
        path: PathBuf,
        /// Diagnostic text reported by the toolchain
        diagnostic: String,
    },

    /// The caller declined to retry a failed initial compile.
    #[error("Shader compilation aborted for \"{}\" - {diagnostic}", .path.display())]
    Aborted {
        /// Root shader file of the failed compile
        path: PathBuf,
        /// Diagnostic of the last failed attempt
        diagnostic: String,
    },

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// Too many definitions were added to a definition set.
    #[error("Too many shader definitions (maximum is {max})")]
    Capacity {
        /// The fixed capacity that was exceeded
        max: usize,
    },

    /// A definition name or value contains an interior NUL byte.
    #[error("Invalid shader definition \"{name}\": names and values may not contain NUL")]
    InvalidDefinition {
        /// The definition name (lossy when the name itself is the culprit)
        name: String,
    },

    /// The stage and entry point of a compile request don't agree.
    #[error("Invalid compile request: {0}")]
    InvalidRequest(String),

    // ========================================================================
    // I/O & Configuration Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

fn included_from_suffix(included_from: Option<&PathBuf>) -> String {
    included_from
        .map(|file| format!(" (included from {})", file.display()))
        .unwrap_or_default()
}

impl ShaderError {
    /// Returns `true` for failures that may succeed when the same compile is
    /// attempted again shortly after.
    ///
    /// Covers toolchain diagnostics (an editor may still be writing the file)
    /// and I/O failures caused by another process holding the file.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Toolchain { .. } => true,
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::PermissionDenied
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::ResourceBusy
            ),
            _ => false,
        }
    }
}

/// Alias for `Result<T, ShaderError>`.
pub type Result<T> = std::result::Result<T, ShaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolchain_errors_are_retryable() {
        let err = ShaderError::Toolchain {
            path: PathBuf::from("a.hlsl"),
            diagnostic: "error: X3000".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn locked_file_is_retryable_but_missing_file_is_not() {
        let locked = ShaderError::Io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(locked.is_retryable());

        let not_found = ShaderError::Io(io::Error::from(io::ErrorKind::NotFound));
        assert!(!not_found.is_retryable());

        let missing = ShaderError::MissingFile {
            path: PathBuf::from("b.hlsl"),
            included_from: None,
        };
        assert!(!missing.is_retryable());
        assert!(!ShaderError::Capacity { max: 64 }.is_retryable());
    }

    #[test]
    fn missing_include_message_names_including_file() {
        let err = ShaderError::MissingFile {
            path: PathBuf::from("Shaders/Common.hlsl"),
            included_from: Some(PathBuf::from("Mesh.hlsl")),
        };
        let message = err.to_string();
        assert!(message.contains("Shaders/Common.hlsl"));
        assert!(message.contains("included from Mesh.hlsl"));
    }
}
