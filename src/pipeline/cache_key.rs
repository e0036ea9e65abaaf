//! Cache Key Generation
//!
//! A [`CacheKey`] is a pure function of everything that influences the
//! compiled bytecode:
//!
//! 1. the flattened source text
//! 2. the entry point (empty for library units)
//! 3. the target profile string
//! 4. the serialized definition set
//! 5. [`CACHE_FORMAT_VERSION`]
//!
//! These are hashed with xxh3-128 and the result is combined with the
//! [`CompilerFingerprint`], a hash of the compiler binary itself folded
//! together with the fixed argument list (see
//! [`CompilerFingerprint::with_arguments`]). Upgrading the toolchain or
//! changing a compiler flag therefore invalidates every existing cache entry
//! without a manual version bump.
//!
//! Every field is length-prefixed with a little-endian `u64`, so adjacent
//! fields can't bleed into each other and the key is identical on every
//! machine and every run.

use std::fmt;
use std::path::Path;

use xxhash_rust::xxh3::{Xxh3, xxh3_128};

use crate::errors::Result;

/// Bump when the on-disk entry format changes.
pub const CACHE_FORMAT_VERSION: u64 = 1;

/// Hash of the compiler toolchain binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompilerFingerprint(u128);

impl CompilerFingerprint {
    #[inline]
    #[must_use]
    pub const fn from_raw(value: u128) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(xxh3_128(bytes))
    }

    /// Hashes the full contents of the file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Folds `arguments` into the fingerprint.
    ///
    /// The result identifies the compiler *and* the flags it runs with, so
    /// two configurations that differ only in, say, `-HV` never share keys.
    #[must_use]
    pub fn with_arguments(self, arguments: &[String]) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(&self.0.to_le_bytes());
        for argument in arguments {
            write_field(&mut hasher, argument.as_bytes());
        }
        Self(hasher.digest128())
    }

    #[inline]
    #[must_use]
    pub fn value(self) -> u128 {
        self.0
    }
}

/// Everything about a compile request that goes into its key.
#[derive(Debug, Clone, Copy)]
pub struct CacheKeyInputs<'a> {
    pub source: &'a str,
    pub entry_point: Option<&'a str>,
    pub profile: &'a str,
    /// Output of [`DefinitionSet::serialize`](super::DefinitionSet::serialize).
    pub definitions: &'a str,
}

/// Content address of one compiled variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(u128);

impl CacheKey {
    #[must_use]
    pub fn compute(inputs: &CacheKeyInputs<'_>, fingerprint: CompilerFingerprint) -> Self {
        let mut hasher = Xxh3::new();
        write_field(&mut hasher, inputs.source.as_bytes());
        write_field(&mut hasher, inputs.entry_point.unwrap_or_default().as_bytes());
        write_field(&mut hasher, inputs.profile.as_bytes());
        write_field(&mut hasher, inputs.definitions.as_bytes());
        write_field(&mut hasher, &CACHE_FORMAT_VERSION.to_le_bytes());
        let content = hasher.digest128();

        let mut combined = [0u8; 32];
        combined[..16].copy_from_slice(&content.to_le_bytes());
        combined[16..].copy_from_slice(&fingerprint.value().to_le_bytes());
        Self(xxh3_128(&combined))
    }

    #[inline]
    #[must_use]
    pub fn value(self) -> u128 {
        self.0
    }
}

fn write_field(hasher: &mut Xxh3, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// 32 lowercase hex digits; used verbatim as the cache file stem.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Computes keys against a fixed compiler fingerprint.
#[derive(Debug, Clone, Copy)]
pub struct CacheKeyGenerator {
    fingerprint: CompilerFingerprint,
}

impl CacheKeyGenerator {
    #[must_use]
    pub fn new(fingerprint: CompilerFingerprint) -> Self {
        Self { fingerprint }
    }

    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> CompilerFingerprint {
        self.fingerprint
    }

    #[inline]
    #[must_use]
    pub fn key_for(&self, inputs: &CacheKeyInputs<'_>) -> CacheKey {
        CacheKey::compute(inputs, self.fingerprint)
    }
}
