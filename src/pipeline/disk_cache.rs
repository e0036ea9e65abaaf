//! Content-addressed bytecode cache.
//!
//! Layout: `<cache_dir>/<build_tag>/<key>.cache`, raw bytecode, no header.
//!
//! Entries are never evicted. Entries orphaned by source changes stay on disk
//! until someone deletes the directory. Writers for the same key may race;
//! the bytes are a pure function of the key, so whichever write lands last is
//! as good as any other. Each write goes to a uniquely named temporary file
//! that is renamed over the entry, so readers never see a partial entry.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use super::cache_key::CacheKey;
use crate::errors::Result;

pub const CACHE_FILE_EXTENSION: &str = "cache";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Cache stored directly in `dir`, usually
    /// [`ShaderConfig::cache_subdir`](crate::config::ShaderConfig::cache_subdir).
    /// Nothing is created until the first [`store`](Self::store).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn entry_path(&self, key: CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{CACHE_FILE_EXTENSION}"))
    }

    /// Returns the stored bytecode, or `None` on a miss.
    pub fn lookup(&self, key: CacheKey) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!("Shader cache hit: {}", path.display());
                Ok(Some(bytes))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes `bytecode` under `key`, creating the directory chain first.
    pub fn store(&self, key: CacheKey, bytecode: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        let temp = self.dir.join(format!(
            "{key}.{CACHE_FILE_EXTENSION}.tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let written = fs::write(&temp, bytecode).and_then(|()| fs::rename(&temp, &path));
        if let Err(err) = written {
            let _ = fs::remove_file(&temp);
            return Err(err.into());
        }
        debug!("Shader cache store: {} ({} bytes)", path.display(), bytecode.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::cache_key::{CacheKeyInputs, CompilerFingerprint};
    use tempfile::TempDir;

    fn key(source: &str) -> CacheKey {
        CacheKey::compute(
            &CacheKeyInputs {
                source,
                entry_point: Some("CSMain"),
                profile: "cs_6_8",
                definitions: "",
            },
            CompilerFingerprint::from_raw(7),
        )
    }

    #[test]
    fn miss_then_hit() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskCache::new(tmp.path().join("ShaderCache").join("Debug"));
        let key = key("a");

        assert_eq!(cache.lookup(key).unwrap(), None);
        cache.store(key, &[1, 2, 3]).unwrap();
        assert_eq!(cache.lookup(key).unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn layout_is_tag_dir_and_key_name() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskCache::new(tmp.path().join("Release"));
        let key = key("b");

        cache.store(key, b"DXIL").unwrap();

        let expected = tmp.path().join("Release").join(format!("{key}.cache"));
        assert_eq!(cache.entry_path(key), expected);
        assert_eq!(fs::read(expected).unwrap(), b"DXIL");
    }

    #[test]
    fn store_overwrites_existing_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskCache::new(tmp.path().join("Debug"));
        let key = key("c");

        cache.store(key, b"first").unwrap();
        cache.store(key, b"second").unwrap();
        assert_eq!(cache.lookup(key).unwrap().as_deref(), Some(&b"second"[..]));
    }

    #[test]
    fn store_leaves_only_the_entry_behind() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskCache::new(tmp.path().join("Debug"));

        cache.store(key("d"), b"one").unwrap();
        cache.store(key("d"), b"two").unwrap();
        cache.store(key("e"), b"three").unwrap();

        let mut names: Vec<String> = fs::read_dir(cache.dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        let mut expected = vec![format!("{}.cache", key("d")), format!("{}.cache", key("e"))];
        expected.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn concurrent_stores_never_expose_partial_entries() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskCache::new(tmp.path().join("Debug"));
        let key = key("f");
        let payload = vec![0xAB_u8; 1 << 20];

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..8 {
                        cache.store(key, &payload).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..64 {
                    if let Some(bytes) = cache.lookup(key).unwrap() {
                        assert_eq!(bytes.len(), payload.len());
                    }
                }
            });
        });

        assert_eq!(cache.lookup(key).unwrap(), Some(payload));
    }
}
