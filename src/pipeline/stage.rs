//! Shader stage kinds and their target profiles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ShaderModel;

/// The pipeline stage a compiled unit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Amplification,
    Mesh,
    Pixel,
    Compute,
    /// Stage-agnostic library unit; compiled without an entry point.
    Library,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 9] = [
        Self::Vertex,
        Self::Hull,
        Self::Domain,
        Self::Geometry,
        Self::Amplification,
        Self::Mesh,
        Self::Pixel,
        Self::Compute,
        Self::Library,
    ];

    /// Human readable stage name used in logs.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Hull => "hull",
            Self::Domain => "domain",
            Self::Geometry => "geometry",
            Self::Amplification => "amplification",
            Self::Mesh => "mesh",
            Self::Pixel => "pixel",
            Self::Compute => "compute",
            Self::Library => "lib",
        }
    }

    #[must_use]
    pub fn profile_prefix(self) -> &'static str {
        match self {
            Self::Vertex => "vs",
            Self::Hull => "hs",
            Self::Domain => "ds",
            Self::Geometry => "gs",
            Self::Amplification => "as",
            Self::Mesh => "ms",
            Self::Pixel => "ps",
            Self::Compute => "cs",
            Self::Library => "lib",
        }
    }

    /// Target profile string, e.g. `ps_6_8`.
    #[must_use]
    pub fn profile(self, model: ShaderModel) -> String {
        format!("{}_{model}", self.profile_prefix())
    }

    #[inline]
    #[must_use]
    pub fn is_library(self) -> bool {
        matches!(self, Self::Library)
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
